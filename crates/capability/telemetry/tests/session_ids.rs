use citydb_telemetry::{init_tracing, new_session_ids};

#[test]
fn session_ids_are_unique() {
    let first = new_session_ids();
    let second = new_session_ids();
    assert!(!first.session_id.is_empty());
    assert_ne!(first.session_id, second.session_id);
}

#[test]
fn init_tracing_twice_is_harmless() {
    init_tracing();
    init_tracing();
}
