use std::sync::Arc;

use behavior_core::{
    BlackboardAsset, BlackboardError, BlackboardReference, BlackboardSet, BlackboardValue, Guid,
    ListenerTarget, ValueType, VariableDefinition, VariableRef,
};

fn asset() -> Arc<BlackboardAsset> {
    Arc::new(
        BlackboardAsset::new(
            Guid::from_u128(100),
            "Guard",
            vec![
                VariableDefinition::new(Guid::from_u128(1), "alert", BlackboardValue::Bool(false)),
                VariableDefinition::new(Guid::from_u128(2), "squad_size", BlackboardValue::Int(3))
                    .shared(),
            ],
        )
        .unwrap(),
    )
}

#[test]
fn instances_get_fresh_storage_except_for_shared_variables() {
    let asset = asset();
    let mut a = BlackboardReference::from_asset(Arc::clone(&asset)).unwrap();
    let b = BlackboardReference::from_asset(asset).unwrap();

    a.blackboard_mut().set(0, BlackboardValue::Bool(true)).unwrap();
    a.blackboard_mut().set(1, BlackboardValue::Int(4)).unwrap();

    assert_eq!(b.blackboard().get(0).unwrap(), BlackboardValue::Bool(false));
    assert_eq!(b.blackboard().get(1).unwrap(), BlackboardValue::Int(4));
    assert!(b.blackboard().variable(1).unwrap().is_shared());
}

#[test]
fn defaults_must_match_declared_type() {
    let mut def = VariableDefinition::new(Guid::from_u128(1), "alert", BlackboardValue::Bool(false));
    def.value_type = ValueType::Int;
    let err = BlackboardAsset::new(Guid::from_u128(1), "Bad", vec![def]).unwrap_err();
    assert!(matches!(err, BlackboardError::TypeMismatch { .. }));
}

#[test]
fn set_searches_primary_before_groups() {
    let group = BlackboardReference::from_asset(asset()).unwrap();
    let primary = BlackboardReference::from_asset(asset()).unwrap();
    let mut boards = BlackboardSet::new(primary).with_group(group);

    assert_eq!(boards.find_by_name("alert"), Some(VariableRef::new(0, 0)));
    assert_eq!(
        boards.find_typed("squad_size", &ValueType::Int),
        Some(VariableRef::new(0, 1))
    );
    assert_eq!(boards.find_typed("squad_size", &ValueType::Bool), None);

    let key = boards
        .subscribe(VariableRef::new(1, 0), ListenerTarget::Notify(3))
        .unwrap();
    boards.set(VariableRef::new(1, 0), BlackboardValue::Bool(true)).unwrap();
    let notices = boards.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].token, 3);
    assert!(boards.unsubscribe(key));

    boards.set_as(VariableRef::new(0, 0), true).unwrap();
    assert!(boards.get_as::<bool>(VariableRef::new(0, 0)).unwrap());
    assert!(boards.get(VariableRef::new(5, 0)).is_err());
}
