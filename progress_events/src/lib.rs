pub mod error;
mod host;
mod registry;
mod subscription;
mod types;

pub use error::{HostError, Result};
pub use host::{EventCallback, EventHost};
pub use registry::{HandlerRegistration, HandlerRegistry};
pub use subscription::{EventSubscriptionManager, SubscriptionMode};
pub use types::{ProgressHandler, ProgressPayload, UploadId};

/// The event channel the upload executor emits progress on.
pub const DEFAULT_PROGRESS_CHANNEL: &str = "upload://progress";
