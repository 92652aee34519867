use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, error, info, trace, warn};
use utils::configuration_utils::FromStrParseable;

use crate::error::Result;
use crate::{EventCallback, EventHost, HandlerRegistry, ProgressPayload};

/// Whether callers of [`EventSubscriptionManager::ensure_subscribed`] wait for the host to confirm
/// the listener before continuing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubscriptionMode {
    /// Issue the listen request and return straight away; confirmation is observed on a
    /// background task. An executor that emits progress before a slow host has finished
    /// registering the listener will have those early events lost.
    #[default]
    Detached,

    /// Every caller waits on the single shared confirmation, so no upload is delegated
    /// before the listener is live.
    Awaited,
}

impl FromStr for SubscriptionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detached" => Ok(SubscriptionMode::Detached),
            "awaited" => Ok(SubscriptionMode::Awaited),
            other => Err(format!("unknown subscription mode {other:?}")),
        }
    }
}

impl fmt::Display for SubscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionMode::Detached => write!(f, "detached"),
            SubscriptionMode::Awaited => write!(f, "awaited"),
        }
    }
}

impl FromStrParseable for SubscriptionMode {}

type Confirmation = Shared<BoxFuture<'static, Result<()>>>;

struct Subscription {
    channel: String,
    confirmation: Confirmation,
}

/// Installs the single progress listener shared by every upload and routes its events
/// to the handlers in the registry.
///
/// The listener is installed at most once per manager, no matter how many uploads race to
/// install it, and is never torn down.
pub struct EventSubscriptionManager {
    host: Arc<dyn EventHost>,
    registry: Arc<HandlerRegistry>,
    mode: SubscriptionMode,
    subscription: OnceLock<Subscription>,
}

impl EventSubscriptionManager {
    pub fn new(host: Arc<dyn EventHost>, registry: Arc<HandlerRegistry>, mode: SubscriptionMode) -> Self {
        Self {
            host,
            registry,
            mode,
            subscription: OnceLock::new(),
        }
    }

    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.get().is_some()
    }

    /// The channel the listener was installed on, if it has been installed.
    pub fn channel(&self) -> Option<&str> {
        self.subscription.get().map(|s| s.channel.as_str())
    }

    /// Makes sure the progress listener is installed on `channel`.
    ///
    /// Once installed this returns without suspending. The first caller marks the listener as
    /// installed and issues the listen request; in [`SubscriptionMode::Detached`] it does not
    /// wait for the host to confirm. A failed confirmation is logged and never reported to the
    /// caller; the listener is not retried.
    pub async fn ensure_subscribed(&self, channel: &str) {
        let mut installed_here = false;

        let subscription = self.subscription.get_or_init(|| {
            installed_here = true;
            self.install_listener(channel)
        });

        if !installed_here && subscription.channel != channel {
            warn!(
                requested = channel,
                installed = subscription.channel.as_str(),
                "Progress listener already installed on a different channel; ignoring request."
            );
        }

        match self.mode {
            SubscriptionMode::Detached => {
                if installed_here {
                    watch_confirmation(subscription.channel.clone(), subscription.confirmation.clone());
                }
            },
            SubscriptionMode::Awaited => {
                let result = subscription.confirmation.clone().await;
                if installed_here {
                    log_confirmation(&subscription.channel, result);
                }
            },
        }
    }

    fn install_listener(&self, channel: &str) -> Subscription {
        let registry = self.registry.clone();
        let callback: EventCallback = Arc::new(move |payload| route_event(&registry, payload));

        info!(channel, mode = %self.mode, "Installing upload progress listener.");

        Subscription {
            channel: channel.to_owned(),
            confirmation: self.host.listen(channel, callback).shared(),
        }
    }
}

/// Decodes a raw progress event and hands it to the handler registered for its id.
fn route_event(registry: &HandlerRegistry, payload: serde_json::Value) {
    let payload: ProgressPayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            debug!("Discarding malformed progress event: {e}");
            return;
        },
    };

    if !registry.dispatch(payload.id, payload.progress, payload.total) {
        trace!(id = %payload.id, "No progress handler registered; event dropped.");
    }
}

fn watch_confirmation(channel: String, confirmation: Confirmation) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                let result = confirmation.await;
                log_confirmation(&channel, result);
            });
        },
        Err(_) => {
            warn!(
                channel = channel.as_str(),
                "No async runtime available; progress listener confirmation will not be observed."
            );
        },
    }
}

fn log_confirmation(channel: &str, result: Result<()>) {
    match result {
        Ok(()) => debug!(channel, "Progress listener confirmed by host."),
        Err(e) => error!(channel, "Failed to install progress listener: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::channel::oneshot;
    use parking_lot::Mutex;
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::{HostError, ProgressHandler, UploadId};

    /// Records listeners as soon as `listen` is called; confirmation is controlled by the test.
    #[derive(Default)]
    struct FakeHost {
        listen_calls: AtomicUsize,
        callbacks: Mutex<Vec<EventCallback>>,
        pending_confirmations: Mutex<Vec<oneshot::Sender<Result<()>>>>,
        confirm_immediately: Option<Result<()>>,
    }

    impl FakeHost {
        fn confirming(result: Result<()>) -> Arc<Self> {
            Arc::new(Self {
                confirm_immediately: Some(result),
                ..Default::default()
            })
        }

        fn deferred() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn emit(&self, payload: serde_json::Value) {
            let callbacks = self.callbacks.lock().clone();
            for cb in callbacks {
                cb(payload.clone());
            }
        }

        fn confirm_all(&self, result: Result<()>) {
            for tx in self.pending_confirmations.lock().drain(..) {
                let _ = tx.send(result.clone());
            }
        }
    }

    impl EventHost for FakeHost {
        fn listen(&self, _channel: &str, callback: EventCallback) -> BoxFuture<'static, Result<()>> {
            self.listen_calls.fetch_add(1, Ordering::SeqCst);
            self.callbacks.lock().push(callback);

            match &self.confirm_immediately {
                Some(result) => futures::future::ready(result.clone()).boxed(),
                None => {
                    let (tx, rx) = oneshot::channel();
                    self.pending_confirmations.lock().push(tx);
                    async move { rx.await.unwrap_or_else(|_| Err(HostError::ChannelClosed("test".into()))) }.boxed()
                },
            }
        }
    }

    fn recording_handler() -> (ProgressHandler, Arc<Mutex<Vec<(u64, u64)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler: ProgressHandler = {
            let calls = calls.clone();
            Arc::new(move |progress, total| calls.lock().push((progress, total)))
        };
        (handler, calls)
    }

    #[tokio::test]
    async fn test_subscribes_once() {
        let host = FakeHost::confirming(Ok(()));
        let manager = EventSubscriptionManager::new(host.clone(), HandlerRegistry::new(), SubscriptionMode::Detached);

        assert!(!manager.is_subscribed());
        for _ in 0..5 {
            manager.ensure_subscribed("upload://progress").await;
        }

        assert!(manager.is_subscribed());
        assert_eq!(manager.channel(), Some("upload://progress"));
        assert_eq!(host.listen_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_subscribe_once() {
        let host = FakeHost::confirming(Ok(()));
        let manager = Arc::new(EventSubscriptionManager::new(
            host.clone(),
            HandlerRegistry::new(),
            SubscriptionMode::Detached,
        ));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let manager = manager.clone();
            tasks.push(tokio::spawn(async move { manager.ensure_subscribed("upload://progress").await }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(host.listen_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detached_does_not_wait_for_confirmation() {
        let host = FakeHost::deferred();
        let manager = EventSubscriptionManager::new(host.clone(), HandlerRegistry::new(), SubscriptionMode::Detached);

        // Would hang if the confirmation were awaited.
        manager.ensure_subscribed("upload://progress").await;
        assert!(manager.is_subscribed());

        host.confirm_all(Ok(()));
    }

    #[tokio::test]
    async fn test_awaited_waits_for_confirmation() {
        let host = FakeHost::deferred();
        let manager = Arc::new(EventSubscriptionManager::new(
            host.clone(),
            HandlerRegistry::new(),
            SubscriptionMode::Awaited,
        ));

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ensure_subscribed("upload://progress").await })
        };

        tokio::task::yield_now().await;
        assert!(manager.is_subscribed());
        assert!(!waiter.is_finished());

        host.confirm_all(Ok(()));
        waiter.await.unwrap();
        assert_eq!(host.listen_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_confirmation_is_logged_not_retried() {
        let host = FakeHost::confirming(Err(HostError::Rejected("no window".into())));
        let manager = EventSubscriptionManager::new(host.clone(), HandlerRegistry::new(), SubscriptionMode::Awaited);

        manager.ensure_subscribed("upload://progress").await;
        manager.ensure_subscribed("upload://progress").await;

        assert!(manager.is_subscribed());
        assert_eq!(host.listen_calls.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Failed to install progress listener"));
    }

    #[tokio::test]
    async fn test_events_routed_to_matching_handler() {
        let host = FakeHost::confirming(Ok(()));
        let registry = HandlerRegistry::new();
        let manager = EventSubscriptionManager::new(host.clone(), registry.clone(), SubscriptionMode::Detached);

        let (h1, calls1) = recording_handler();
        let (h2, calls2) = recording_handler();
        registry.insert(UploadId::new(11), h1);
        registry.insert(UploadId::new(22), h2);

        manager.ensure_subscribed("upload://progress").await;
        host.emit(json!({"id": 22, "progress": 50, "total": 100}));

        assert!(calls1.lock().is_empty());
        assert_eq!(*calls2.lock(), vec![(50, 100)]);
    }

    #[tokio::test]
    async fn test_unmatched_and_malformed_events_are_dropped() {
        let host = FakeHost::confirming(Ok(()));
        let registry = HandlerRegistry::new();
        let manager = EventSubscriptionManager::new(host.clone(), registry.clone(), SubscriptionMode::Detached);

        let (h, calls) = recording_handler();
        registry.insert(UploadId::new(1), h);
        manager.ensure_subscribed("upload://progress").await;

        host.emit(json!({"id": 2, "progress": 1, "total": 2}));
        host.emit(json!({"progress": 1, "total": 2}));
        host.emit(json!("garbage"));

        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_second_channel_is_ignored() {
        let host = FakeHost::confirming(Ok(()));
        let manager = EventSubscriptionManager::new(host.clone(), HandlerRegistry::new(), SubscriptionMode::Detached);

        manager.ensure_subscribed("upload://progress").await;
        manager.ensure_subscribed("other://progress").await;

        assert_eq!(manager.channel(), Some("upload://progress"));
        assert_eq!(host.listen_calls.load(Ordering::SeqCst), 1);
        assert!(logs_contain("different channel"));
    }

    #[test]
    fn test_subscription_mode_parsing() {
        assert_eq!("awaited".parse::<SubscriptionMode>(), Ok(SubscriptionMode::Awaited));
        assert_eq!(" Detached ".parse::<SubscriptionMode>(), Ok(SubscriptionMode::Detached));
        assert!("eventually".parse::<SubscriptionMode>().is_err());
        assert_eq!(SubscriptionMode::Awaited.to_string(), "awaited");
    }
}
