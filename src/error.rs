use thiserror::Error;

/// Why a single probe produced no record.
///
/// Probe errors never leave the scheduler; they are counted as checked and
/// logged at debug level.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("status service answered HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProbeError::Decode(e.to_string())
        } else {
            ProbeError::Request(e.to_string())
        }
    }
}

/// Failure to load one target list provider.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in target list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("target list must be a JSON array")]
    NotAnArray,
}

/// Rejections from the scan control surface.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("a scan is already running")]
    AlreadyRunning,

    #[error("the previous scan is still stopping")]
    Stopping,

    #[error("no targets to scan")]
    NoTargets,
}
