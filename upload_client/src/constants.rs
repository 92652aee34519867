use progress_events::{DEFAULT_PROGRESS_CHANNEL, SubscriptionMode};
use utils::configurable_constants;

use crate::config::IdStrategy;

configurable_constants! {
    /// The event channel the executor publishes progress on.
    ref PROGRESS_EVENT_CHANNEL: String = DEFAULT_PROGRESS_CHANNEL.to_owned();

    /// The host command that performs the actual upload.
    ref UPLOAD_COMMAND: String = "plugin:gotbackup|upload".to_owned();

    /// How upload ids are drawn; "random" or "sequential".
    ref ID_STRATEGY: IdStrategy = IdStrategy::Random;

    /// Whether uploads wait for the progress listener to be confirmed; "detached" or "awaited".
    ref SUBSCRIPTION_MODE: SubscriptionMode = SubscriptionMode::Detached;

    /// Remove an upload's progress handler once the upload resolves.  If false, handlers
    /// stay registered for the lifetime of the coordinator.
    ref RELEASE_HANDLERS_ON_COMPLETION: bool = true;

    /// The format the logs are printed in. If "json", logs are dumped as json blobs; otherwise as text.
    ref LOG_FORMAT: Option<String> = None;

    /// Log level used when RUST_LOG is not set.
    ref LOG_LEVEL: String = "warn".to_owned();
}
