use thiserror::Error;

/// Failures reported by the host event system when registering a listener.
///
/// Clone is required as a single listener confirmation is shared by every
/// upload that waits on it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Listener registration rejected by host: {0}")]
    Rejected(String),

    #[error("Event channel {0} is closed")]
    ChannelClosed(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            HostError::Rejected("no window".to_owned()).to_string(),
            "Listener registration rejected by host: no window"
        );
        assert_eq!(
            HostError::ChannelClosed("upload://progress".to_owned()).to_string(),
            "Event channel upload://progress is closed"
        );
    }
}
