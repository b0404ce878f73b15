use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid probe dump {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("cannot decode listing page {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("pagination revisits {0}")]
    PaginationCycle(String),

    #[error("pagination stopped after {0} pages")]
    TooManyPages(usize),
}

impl DirectoryError {
    /// Transport failures, throttling and server errors are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::Transport { .. } => true,
            DirectoryError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
