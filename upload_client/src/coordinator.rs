use std::sync::Arc;

use progress_events::{EventHost, EventSubscriptionManager, HandlerRegistry, SubscriptionMode};
use tracing::{debug, info};

use crate::config::UploadConfig;
use crate::executor::{CommandChannel, CommandExecutor, UploadExecutor};
use crate::id_generator::IdGenerator;
use crate::options::{UploadOptions, UploadRequest};

/// The state every upload of one coordinator shares: the handler registry and the
/// single progress subscription that feeds it.
pub struct UploadContext {
    registry: Arc<HandlerRegistry>,
    subscriptions: EventSubscriptionManager,
}

impl UploadContext {
    pub fn new(host: Arc<dyn EventHost>, mode: SubscriptionMode) -> Self {
        let registry = HandlerRegistry::new();
        let subscriptions = EventSubscriptionManager::new(host, registry.clone(), mode);
        Self {
            registry,
            subscriptions,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn subscriptions(&self) -> &EventSubscriptionManager {
        &self.subscriptions
    }
}

/// Starts uploads on an executor and routes the progress they report back to each caller.
///
/// Any number of uploads may run concurrently on one coordinator; they share a single
/// listener on the progress channel and are told apart by the id each one is tagged with.
pub struct UploadCoordinator<E: UploadExecutor + ?Sized> {
    context: UploadContext,
    executor: Arc<E>,
    ids: IdGenerator,
    config: UploadConfig,
}

impl<E: UploadExecutor + ?Sized> UploadCoordinator<E> {
    pub fn new(host: Arc<dyn EventHost>, executor: Arc<E>) -> Self {
        Self::with_config(host, executor, UploadConfig::default())
    }

    pub fn with_config(host: Arc<dyn EventHost>, executor: Arc<E>, config: UploadConfig) -> Self {
        info!(
            channel = config.progress_channel.as_str(),
            id_strategy = %config.id_strategy,
            subscription_mode = %config.subscription_mode,
            "Creating upload coordinator."
        );

        Self {
            context: UploadContext::new(host, config.subscription_mode),
            executor,
            ids: IdGenerator::new(config.id_strategy),
            config,
        }
    }

    pub fn context(&self) -> &UploadContext {
        &self.context
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    /// Uploads `options.file_path` to `options.url` and resolves when the executor finishes.
    ///
    /// The progress handler, if any, is called with (progress, total) for every progress event
    /// the executor emits for this upload while the call is pending.  Executor failures are
    /// returned exactly as the executor reported them.
    ///
    /// With `release_handlers_on_completion` set, the handler is unregistered once this call
    /// resolves or is dropped, and any later event for its id is discarded.
    pub async fn upload(&self, options: UploadOptions) -> Result<(), E::Error> {
        let UploadOptions {
            url,
            file_path,
            progress_handler,
            headers,
        } = options;

        let id = self.ids.next_id();

        // Registration must precede both the subscription and the delegated call.
        let _registration = progress_handler.and_then(|handler| {
            let registration = self.context.registry.register(id, handler);
            if self.config.release_handlers_on_completion {
                Some(registration)
            } else {
                registration.persist();
                None
            }
        });

        self.context
            .subscriptions
            .ensure_subscribed(&self.config.progress_channel)
            .await;

        let request = UploadRequest {
            id,
            url,
            file_path,
            headers: headers.unwrap_or_default(),
        };

        debug!(%id, url = request.url.as_str(), file_path = ?request.file_path, "Delegating upload.");

        let result = self.executor.upload(request).await;

        match &result {
            Ok(()) => debug!(%id, "Upload completed."),
            Err(e) => debug!(%id, "Upload failed: {e}"),
        }

        result
    }
}

impl<C: CommandChannel + ?Sized> UploadCoordinator<CommandExecutor<C>> {
    /// Builds a coordinator that runs uploads through `config.upload_command` on `commands`.
    pub fn from_command_channel(host: Arc<dyn EventHost>, commands: Arc<C>, config: UploadConfig) -> Self {
        let executor = Arc::new(CommandExecutor::with_command(commands, config.upload_command.as_str()));
        Self::with_config(host, executor, config)
    }
}
