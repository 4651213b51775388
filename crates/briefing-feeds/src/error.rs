use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl FeedError {
    /// True for failures caused by a deadline rather than by the server.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            FeedError::Timeout { .. } => true,
            FeedError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
