use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use progress_events::{ProgressHandler, UploadId};
use serde::{Deserialize, Serialize};

/// What to upload, where, and who to tell about progress.
///
/// Neither the url nor the path are checked here; the executor decides what is valid.
#[derive(Clone, Default)]
pub struct UploadOptions {
    pub url: String,
    pub file_path: PathBuf,
    pub progress_handler: Option<ProgressHandler>,
    pub headers: Option<HashMap<String, String>>,
}

impl UploadOptions {
    pub fn new(url: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// Called with (progress, total) in bytes as the executor reports progress.
    pub fn with_progress_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.progress_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(HashMap::new).insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("url", &self.url)
            .field("file_path", &self.file_path)
            .field("progress_handler", &self.progress_handler.is_some())
            .field("headers", &self.headers)
            .finish()
    }
}

/// The arguments handed to the executor for a single upload.
///
/// Serialized as `{"id", "url", "filePath", "headers"}` when sent over a command channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub id: UploadId,
    pub url: String,
    pub file_path: PathBuf,
    pub headers: HashMap<String, String>,
}
