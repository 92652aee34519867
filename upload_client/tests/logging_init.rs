//! Installs a global subscriber, so it runs in its own binary.

use tracing::Level;
use upload_client::logging::{LoggingConfig, init_logging};
use utils::EnvVarGuard;

#[test]
fn test_init_logging_keeps_first_subscriber() {
    {
        let _filter = EnvVarGuard::set("RUST_LOG", "debug");
        init_logging(LoggingConfig {
            use_json: false,
            default_level: "warn".to_owned(),
        });
    }
    assert!(tracing::enabled!(Level::DEBUG));

    {
        let _filter = EnvVarGuard::set("RUST_LOG", "error");
        init_logging(LoggingConfig {
            use_json: true,
            default_level: "error".to_owned(),
        });
    }
    assert!(tracing::enabled!(Level::DEBUG));
}
