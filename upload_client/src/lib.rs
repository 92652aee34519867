pub mod config;
pub mod constants;
mod coordinator;
pub mod error;
mod executor;
mod id_generator;
pub mod logging;
mod options;

pub use config::{IdStrategy, UploadConfig};
pub use coordinator::{UploadContext, UploadCoordinator};
pub use error::CommandError;
pub use executor::{CommandChannel, CommandExecutor, UploadExecutor};
pub use id_generator::IdGenerator;
pub use options::{UploadOptions, UploadRequest};
// Re-export so callers only need this crate to wire up a host.
pub use progress_events::{
    EventCallback, EventHost, HostError, ProgressHandler, ProgressPayload, SubscriptionMode, UploadId,
};
