//! Error types for mrsi
//!
//! Two tiers: [`RunError`] halts a run before or during dispatch, while
//! [`RequestError`] describes the failure of a single request and is only
//! ever recorded and counted.

use thiserror::Error;

/// Fatal error that aborts a run
#[derive(Error, Debug)]
pub enum RunError {
    /// Invalid method/body/header combination or out-of-range setting
    #[error("configuration error: {0}")]
    Config(String),

    /// A rendered template did not parse as a URL
    #[error("malformed url {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },

    /// The HTTP client could not be constructed
    #[error("http client error: {0}")]
    Client(String),

    /// A sequencer or worker task panicked or was aborted
    #[error("task failed: {0}")]
    Task(String),

    /// A profile could not be decoded or encoded
    #[error("profile error: {0}")]
    Profile(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Failure of one request; recorded, never fatal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Connection, DNS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response status outside 2xx
    #[error("server returned {0}")]
    HttpStatus(u16),

    /// Reading the response body failed after a 2xx status
    #[error("body read error: {0}")]
    BodyRead(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = RunError::MalformedUrl {
            url: "http://[::1".to_string(),
            reason: "invalid IPv6 address".to_string(),
        };
        assert!(err.to_string().contains("http://[::1"));

        assert_eq!(RequestError::HttpStatus(503).to_string(), "server returned 503");
        assert_eq!(
            RunError::config("GET can't carry a request body").to_string(),
            "configuration error: GET can't carry a request body"
        );
    }
}
