use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Correlates progress events on the shared channel with the upload that caused them.
///
/// Carries no meaning beyond being a lookup key; it is only required to be unique among
/// uploads that are in flight at the same time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(u32);

impl UploadId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for UploadId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress callback receiving (progress, total) in bytes.
pub type ProgressHandler = Arc<dyn Fn(u64, u64) + Send + Sync + 'static>;

/// A single progress event as emitted by the upload executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub id: UploadId,
    pub progress: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_wire_format() {
        let payload: ProgressPayload = serde_json::from_value(json!({"id": 4000000000u32, "progress": 50, "total": 100}))
            .unwrap();
        assert_eq!(
            payload,
            ProgressPayload {
                id: UploadId::new(4_000_000_000),
                progress: 50,
                total: 100,
            }
        );

        let value = serde_json::to_value(payload).unwrap();
        assert_eq!(value, json!({"id": 4000000000u32, "progress": 50, "total": 100}));
    }

    #[test]
    fn test_payload_rejects_missing_fields() {
        assert!(serde_json::from_value::<ProgressPayload>(json!({"id": 1, "progress": 50})).is_err());
        assert!(serde_json::from_value::<ProgressPayload>(json!({"id": -1, "progress": 0, "total": 0})).is_err());
    }
}
