use std::fmt;
use std::str::FromStr;

use progress_events::SubscriptionMode;
use utils::configuration_utils::FromStrParseable;

use crate::constants::{
    ID_STRATEGY, PROGRESS_EVENT_CHANNEL, RELEASE_HANDLERS_ON_COMPLETION, SUBSCRIPTION_MODE, UPLOAD_COMMAND,
};

/// How a coordinator draws upload ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdStrategy {
    /// A full 32 bit value from the operating system's CSPRNG.  Collisions between live
    /// uploads are possible but vanishingly unlikely.
    #[default]
    Random,

    /// A wrapping counter owned by the coordinator; ids never collide among fewer than 2^32 live uploads.
    Sequential,
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(IdStrategy::Random),
            "sequential" | "counter" => Ok(IdStrategy::Sequential),
            other => Err(format!("unknown id strategy {other:?}")),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdStrategy::Random => write!(f, "random"),
            IdStrategy::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStrParseable for IdStrategy {}

/// Settings for an [`crate::UploadCoordinator`].
///
/// `UploadConfig::default()` takes every value from the `UPLOAD_PROGRESS_*` environment
/// variables, falling back to the built in defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadConfig {
    pub progress_channel: String,
    pub upload_command: String,
    pub id_strategy: IdStrategy,
    pub subscription_mode: SubscriptionMode,
    pub release_handlers_on_completion: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            progress_channel: PROGRESS_EVENT_CHANNEL.clone(),
            upload_command: UPLOAD_COMMAND.clone(),
            id_strategy: *ID_STRATEGY,
            subscription_mode: *SUBSCRIPTION_MODE,
            release_handlers_on_completion: *RELEASE_HANDLERS_ON_COMPLETION,
        }
    }
}

impl UploadConfig {
    pub fn with_progress_channel(mut self, channel: impl Into<String>) -> Self {
        self.progress_channel = channel.into();
        self
    }

    pub fn with_upload_command(mut self, command: impl Into<String>) -> Self {
        self.upload_command = command.into();
        self
    }

    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    pub fn with_subscription_mode(mut self, mode: SubscriptionMode) -> Self {
        self.subscription_mode = mode;
        self
    }

    pub fn with_release_handlers_on_completion(mut self, release: bool) -> Self {
        self.release_handlers_on_completion = release;
        self
    }
}
