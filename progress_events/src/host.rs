use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;

/// Called by the host with the raw JSON payload of each event delivered on a channel.
pub type EventCallback = Arc<dyn Fn(serde_json::Value) + Send + Sync + 'static>;

/// The host's event system, on which the upload executor publishes progress.
pub trait EventHost: Send + Sync {
    /// Starts registering `callback` for every event on `channel`.
    ///
    /// The registration request is issued when this is called; the returned future resolves
    /// once the host confirms the listener is active. Events may be delivered on any thread.
    /// Implementations must not call back into the subscriber from within `listen` itself.
    fn listen(&self, channel: &str, callback: EventCallback) -> BoxFuture<'static, Result<()>>;
}
