//! Installing the global subscriber.

use logging::{InitError, LogConfig, init_tracing};

#[test]
fn second_installation_is_reported_not_fatal() {
    init_tracing(&LogConfig::new(true)).expect("first installation");
    tracing::debug!(target: "ftpush::test", "subscriber installed");

    let error = init_tracing(&LogConfig::new(false)).unwrap_err();
    assert!(matches!(error, InitError::Install(_)));
}
