use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::constants::UPLOAD_COMMAND;
use crate::error::{CommandError, Result};
use crate::options::UploadRequest;

/// The external component that performs the transfer.
///
/// Progress is reported out of band, by emitting [`progress_events::ProgressPayload`] events
/// tagged with `request.id` on the host's progress channel while the call is pending.
#[async_trait]
pub trait UploadExecutor: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn upload(&self, request: UploadRequest) -> std::result::Result<(), Self::Error>;
}

/// A host command channel: named commands taking and returning JSON.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn invoke(&self, command: &str, args: serde_json::Value) -> Result<serde_json::Value>;
}

/// Runs uploads by invoking a named command on a [`CommandChannel`].
///
/// Whatever the command returns on success is discarded.
pub struct CommandExecutor<C: ?Sized> {
    channel: Arc<C>,
    command: String,
}

impl<C: CommandChannel + ?Sized> CommandExecutor<C> {
    pub fn new(channel: Arc<C>) -> Self {
        Self::with_command(channel, UPLOAD_COMMAND.as_str())
    }

    pub fn with_command(channel: Arc<C>, command: impl Into<String>) -> Self {
        Self {
            channel,
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl<C: CommandChannel + ?Sized> UploadExecutor for CommandExecutor<C> {
    type Error = CommandError;

    async fn upload(&self, request: UploadRequest) -> Result<()> {
        let id = request.id;
        let args = serde_json::to_value(&request)?;

        debug!(%id, command = self.command.as_str(), "Invoking upload command.");
        let _response = self.channel.invoke(&self.command, args).await?;

        Ok(())
    }
}
