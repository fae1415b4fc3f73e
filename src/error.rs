//! Error types for the mockup bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while wiring or driving a bridge
#[derive(Error, Debug)]
pub enum Error {
    /// The init configuration is unusable (e.g. empty website key)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No frame element with the given id exists in the document
    #[error("Iframe with ID '{0}' not found.")]
    MissingFrame(String),

    /// A URL or origin could not be parsed into a host
    #[error("Invalid Host URL: {0}")]
    HostParse(String),

    /// An export asset answered with a non-success HTTP status
    #[error("Failed to fetch {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// Transport-level failure while fetching
    #[error("Network error: {0}")]
    Network(String),

    /// Posting a message into the frame failed
    #[error("Failed to post message: {0}")]
    PostMessage(String),

    /// Handing a blob to the download sink failed
    #[error("Download failed: {0}")]
    Download(String),

    /// An artwork payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Payload (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
