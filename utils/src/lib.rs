#![cfg_attr(feature = "strict", deny(warnings))]

pub mod configuration_utils;
pub use configuration_utils::{ParsableConfigValue, parse_bool_value};

mod guards;
pub use guards::EnvVarGuard;

// Macros configurable_constants! and test_set_constants! are exported at crate root by #[macro_export]
