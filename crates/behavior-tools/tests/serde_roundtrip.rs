#![cfg(feature = "serde")]

use behavior_tools::{tags, TraceEvent, TraceLog};

#[test]
fn trace_log_json_roundtrip() {
    let log = TraceLog {
        events: vec![
            TraceEvent::new(1, tags::NODE_START).with_a(0).with_b(1),
            TraceEvent::new(2, tags::NODE_AWAKE).with_a(3).with_b(3),
            TraceEvent::new(2, tags::NODE_END).with_a(3).with_b(3),
        ],
    };

    let json = serde_json::to_string(&log).expect("serialize");
    let roundtrip: TraceLog = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, log);
}
