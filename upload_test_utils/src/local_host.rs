use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use progress_events::{DEFAULT_PROGRESS_CHANNEL, EventCallback, EventHost, HostError, ProgressPayload, UploadId};
use serde_json::json;
use tokio::sync::{Notify, watch};
use tracing::debug;
use upload_client::constants::UPLOAD_COMMAND;
use upload_client::{CommandChannel, CommandError, UploadRequest};

/// A command received by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub args: serde_json::Value,
}

impl Invocation {
    /// Decodes the arguments as an upload request, if they are one.
    pub fn request(&self) -> Option<UploadRequest> {
        serde_json::from_value(self.args.clone()).ok()
    }
}

/// How the host answers a request to listen on a channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ListenBehavior {
    /// The listener is live by the time `listen` returns.
    #[default]
    Immediate,

    /// The listener only goes live once the confirmation is driven, after yielding once;
    /// models a host whose registration round trip is slow.
    Lazy,

    /// The host refuses the listener.
    Reject(String),
}

/// What the host does when asked to run an upload.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadBehavior {
    /// Emit each (progress, total) pair for the request's id, then succeed with `response`.
    Scripted {
        progress: Vec<(u64, u64)>,
        response: serde_json::Value,
    },

    /// Report the file's size in `chunk_size` steps.  Fails the way a host does when the file
    /// can't be read, with the io error's message.
    FromFile { chunk_size: u64 },

    /// Fail with this message without reporting any progress.
    Fail(String),
}

impl Default for UploadBehavior {
    fn default() -> Self {
        UploadBehavior::Scripted {
            progress: vec![],
            response: json!({}),
        }
    }
}

struct LocalHostInner {
    progress_channel: String,
    upload_command: String,
    listen_behavior: ListenBehavior,

    listeners: Mutex<HashMap<String, Vec<EventCallback>>>,
    listen_calls: AtomicUsize,

    upload_behavior: Mutex<UploadBehavior>,
    invocations: Mutex<Vec<Invocation>>,
    invoked: Notify,

    /// Uploads block while this is false.
    gate: watch::Sender<bool>,
}

impl LocalHostInner {
    fn add_listener(&self, channel: &str, callback: EventCallback) {
        self.listeners.lock().entry(channel.to_owned()).or_default().push(callback);
    }
}

/// An in-process host: an event system plus a command channel that emulates the upload executor.
///
/// Cloning is cheap; all clones share the same listeners, invocations and behavior.
#[derive(Clone)]
pub struct LocalHost {
    inner: Arc<LocalHostInner>,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHost {
    pub fn new() -> Self {
        Self::with_listen_behavior(ListenBehavior::Immediate)
    }

    pub fn with_listen_behavior(listen_behavior: ListenBehavior) -> Self {
        Self::with_options(DEFAULT_PROGRESS_CHANNEL, UPLOAD_COMMAND.as_str(), listen_behavior)
    }

    pub fn with_options(
        progress_channel: impl Into<String>,
        upload_command: impl Into<String>,
        listen_behavior: ListenBehavior,
    ) -> Self {
        let (gate, _) = watch::channel(true);

        Self {
            inner: Arc::new(LocalHostInner {
                progress_channel: progress_channel.into(),
                upload_command: upload_command.into(),
                listen_behavior,
                listeners: Mutex::new(HashMap::new()),
                listen_calls: AtomicUsize::new(0),
                upload_behavior: Mutex::new(UploadBehavior::default()),
                invocations: Mutex::new(Vec::new()),
                invoked: Notify::new(),
                gate,
            }),
        }
    }

    pub fn set_upload_behavior(&self, behavior: UploadBehavior) {
        *self.inner.upload_behavior.lock() = behavior;
    }

    /// Uploads started after this block until [`Self::resume_uploads`] is called.
    pub fn pause_uploads(&self) {
        self.inner.gate.send_replace(false);
    }

    pub fn resume_uploads(&self) {
        self.inner.gate.send_replace(true);
    }

    /// How many times `listen` has been called, on any channel.
    pub fn listen_calls(&self) -> usize {
        self.inner.listen_calls.load(Ordering::SeqCst)
    }

    /// Number of live listeners on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner.listeners.lock().get(channel).map_or(0, Vec::len)
    }

    /// Delivers `payload` to every live listener on `channel`.
    pub fn emit(&self, channel: &str, payload: serde_json::Value) {
        let callbacks = self.inner.listeners.lock().get(channel).cloned().unwrap_or_default();
        for callback in callbacks {
            callback(payload.clone());
        }
    }

    /// Emits a progress event for `id` on the progress channel.
    pub fn emit_progress(&self, id: UploadId, progress: u64, total: u64) {
        let payload = ProgressPayload { id, progress, total };
        match serde_json::to_value(payload) {
            Ok(value) => self.emit(&self.inner.progress_channel, value),
            Err(e) => debug!("Failed to encode progress payload: {e}"),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.inner.invocations.lock().clone()
    }

    /// Waits until at least `n` commands have been received and returns all of them.
    pub async fn wait_for_invocations(&self, n: usize) -> Vec<Invocation> {
        loop {
            let notified = self.inner.invoked.notified();
            {
                let invocations = self.inner.invocations.lock();
                if invocations.len() >= n {
                    return invocations.clone();
                }
            }
            notified.await;
        }
    }

    async fn run_upload(&self, request: UploadRequest) -> Result<serde_json::Value, CommandError> {
        let behavior = self.inner.upload_behavior.lock().clone();

        match behavior {
            UploadBehavior::Scripted { progress, response } => {
                for (completed, total) in progress {
                    self.emit_progress(request.id, completed, total);
                    tokio::task::yield_now().await;
                }
                Ok(response)
            },
            UploadBehavior::FromFile { chunk_size } => {
                let total = tokio::fs::metadata(&request.file_path)
                    .await
                    .map_err(|e| CommandError::Rejected(e.to_string()))?
                    .len();

                let mut completed = 0;
                while completed < total {
                    completed = (completed + chunk_size.max(1)).min(total);
                    self.emit_progress(request.id, completed, total);
                    tokio::task::yield_now().await;
                }
                Ok(json!({ "size": total }))
            },
            UploadBehavior::Fail(message) => Err(CommandError::Rejected(message)),
        }
    }
}

impl EventHost for LocalHost {
    fn listen(&self, channel: &str, callback: EventCallback) -> BoxFuture<'static, progress_events::Result<()>> {
        self.inner.listen_calls.fetch_add(1, Ordering::SeqCst);

        match &self.inner.listen_behavior {
            ListenBehavior::Immediate => {
                self.inner.add_listener(channel, callback);
                futures::future::ready(Ok(())).boxed()
            },
            ListenBehavior::Lazy => {
                let inner = self.inner.clone();
                let channel = channel.to_owned();
                async move {
                    tokio::task::yield_now().await;
                    inner.add_listener(&channel, callback);
                    Ok(())
                }
                .boxed()
            },
            ListenBehavior::Reject(message) => {
                futures::future::ready(Err(HostError::Rejected(message.clone()))).boxed()
            },
        }
    }
}

#[async_trait]
impl CommandChannel for LocalHost {
    async fn invoke(&self, command: &str, args: serde_json::Value) -> Result<serde_json::Value, CommandError> {
        self.inner.invocations.lock().push(Invocation {
            command: command.to_owned(),
            args: args.clone(),
        });
        self.inner.invoked.notify_waiters();

        if command != self.inner.upload_command {
            return Err(CommandError::Rejected(format!("command {command} not found")));
        }

        let request: UploadRequest = serde_json::from_value(args)?;

        let mut gate = self.inner.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(CommandError::ChannelClosed);
        }

        self.run_upload(request).await
    }
}
