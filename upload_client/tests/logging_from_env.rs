//! Logging settings are read from the environment on first use, so this binary sets them
//! before anything else reads them.

use upload_client::logging::LoggingConfig;
use utils::EnvVarGuard;

#[test]
fn test_logging_config_reads_environment() {
    let _format = EnvVarGuard::set("UPLOAD_PROGRESS_LOG_FORMAT", "json");
    let _level = EnvVarGuard::set("UPLOAD_PROGRESS_LOG_LEVEL", "upload_client=debug");

    let cfg = LoggingConfig::new();

    assert!(cfg.use_json);
    assert_eq!(cfg.default_level, "upload_client=debug");
}
