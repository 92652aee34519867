use thiserror::Error;

/// Errors from invoking a command on the host's command channel.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// The host ran the command and it failed.  Hosts report command failures as the
    /// display string of the underlying error (file not found, request failed, ...),
    /// which is kept here verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Command channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, CommandError>;

impl PartialEq for CommandError {
    fn eq(&self, other: &CommandError) -> bool {
        match (self, other) {
            (CommandError::Rejected(a), CommandError::Rejected(b)) => a == b,
            (e1, e2) => std::mem::discriminant(e1) == std::mem::discriminant(e2),
        }
    }
}
