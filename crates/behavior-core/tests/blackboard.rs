use std::sync::{Arc, Mutex};

use behavior_core::{
    Blackboard, BlackboardError, BlackboardValue, BlackboardVariable, Guid, ListenerTarget,
    ValueType,
};

fn board() -> Blackboard {
    Blackboard::from_variables(vec![
        BlackboardVariable::new(Guid::from_u128(1), "health", BlackboardValue::Int(100)),
        BlackboardVariable::new(Guid::from_u128(2), "target", BlackboardValue::Object(None)),
        BlackboardVariable::new(Guid::from_u128(3), "health", BlackboardValue::Float(0.5)),
    ])
    .unwrap()
}

#[test]
fn lookup_by_guid_and_first_name_match() {
    let bb = board();
    assert_eq!(bb.index_of(Guid::from_u128(3)), Some(2));
    assert_eq!(bb.index_of_name("health"), Some(0));
    assert_eq!(bb.get_by_name("health").unwrap(), BlackboardValue::Int(100));
    assert_eq!(bb.get_by_guid(Guid::from_u128(3)).unwrap(), BlackboardValue::Float(0.5));
    assert!(bb.find_by_name("missing").is_none());
}

#[test]
fn duplicate_guid_is_rejected() {
    let mut bb = board();
    let err = bb
        .add(BlackboardVariable::new(Guid::from_u128(1), "again", BlackboardValue::Bool(true)))
        .unwrap_err();
    assert_eq!(err, BlackboardError::DuplicateVariable(Guid::from_u128(1)));
}

#[test]
fn writes_of_another_type_are_rejected() {
    let mut bb = board();
    let err = bb.set(0, BlackboardValue::String("full".into())).unwrap_err();
    assert!(matches!(
        err,
        BlackboardError::TypeMismatch {
            expected: ValueType::Int,
            found: ValueType::String,
            ..
        }
    ));
    assert_eq!(bb.get_as::<i64>(0).unwrap(), 100);
}

#[test]
fn every_write_notifies_exactly_once() {
    let mut bb = board();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback = bb
        .subscribe(
            0,
            ListenerTarget::Callback(Box::new(move |change| {
                sink.lock().unwrap().push(change.value.clone());
            })),
        )
        .unwrap();
    let mailbox = bb.subscribe(0, ListenerTarget::Mailbox).unwrap();

    bb.set(0, BlackboardValue::Int(90)).unwrap();
    bb.set(0, BlackboardValue::Int(90)).unwrap();
    bb.set(1, BlackboardValue::Object(None)).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![BlackboardValue::Int(90), BlackboardValue::Int(90)]
    );
    assert_eq!(bb.take_pending(mailbox).unwrap(), 2);
    assert_eq!(bb.take_pending(mailbox).unwrap(), 0);

    // Nothing left to deliver.
    assert_eq!(bb.poll().unwrap(), 0);

    assert!(bb.unsubscribe(callback));
    assert!(!bb.unsubscribe(callback));
    bb.set(0, BlackboardValue::Int(80)).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(bb.take_pending(mailbox).unwrap(), 1);
}

#[test]
fn notify_listeners_queue_notices_with_their_token() {
    let mut bb = board();
    bb.subscribe(1, ListenerTarget::Notify(7)).unwrap();
    bb.set(1, BlackboardValue::Object(None)).unwrap();

    let notices = bb.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].token, 7);
    assert_eq!(notices[0].variable, Guid::from_u128(2));
    assert!(bb.take_notices().is_empty());
}

#[test]
fn shared_storage_writes_are_seen_by_poll() {
    let mut a = board();
    let mut b = a.instance().unwrap();
    b.substitute(0, a.variable(0).unwrap()).unwrap();
    let listener = b.subscribe(0, ListenerTarget::Mailbox).unwrap();

    a.set(0, BlackboardValue::Int(5)).unwrap();
    assert_eq!(b.get(0).unwrap(), BlackboardValue::Int(5));
    assert_eq!(b.take_pending(listener).unwrap(), 0);
    assert_eq!(b.poll().unwrap(), 1);
    assert_eq!(b.take_pending(listener).unwrap(), 1);
}

#[test]
fn instance_copies_values_into_fresh_storage() {
    let mut a = board();
    let b = a.instance().unwrap();
    a.set(0, BlackboardValue::Int(1)).unwrap();
    assert_eq!(b.get(0).unwrap(), BlackboardValue::Int(100));
    assert!(!a.variable(0).unwrap().same_storage(b.variable(0).unwrap()));
}

#[test]
fn restore_does_not_notify() {
    let mut bb = board();
    let listener = bb.subscribe(0, ListenerTarget::Mailbox).unwrap();
    bb.restore(0, BlackboardValue::Int(3)).unwrap();
    assert_eq!(bb.poll().unwrap(), 0);
    assert_eq!(bb.take_pending(listener).unwrap(), 0);
    assert_eq!(bb.get(0).unwrap(), BlackboardValue::Int(3));
}

#[test]
fn shared_variables_refuse_substitution() {
    let shared = BlackboardVariable::new(Guid::from_u128(9), "team", BlackboardValue::Int(1))
        .with_shared(true);
    let mut bb = Blackboard::from_variables(vec![shared]).unwrap();
    let other = BlackboardVariable::new(Guid::from_u128(10), "team", BlackboardValue::Int(2));
    assert_eq!(
        bb.substitute(0, &other).unwrap_err(),
        BlackboardError::SharedOverride("team".into())
    );
}
