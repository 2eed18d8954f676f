use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to retrieve a course page from the wiki.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout { url: url.to_string() };
        }
        match err.status() {
            Some(status) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            None => FetchError::Request {
                url: url.to_string(),
                source: err,
            },
        }
    }
}

/// A course code that cannot be used as a page name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("course code is empty")]
    Empty,

    #[error("course code {0:?} contains characters outside A-Z, 0-9, '_', '.', '-'")]
    InvalidCode(String),
}

/// A reply from the query server without the `" - "` separator.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("response {0:?} has no \" - \" separator")]
pub struct MalformedResponse(pub String);

/// Reading or writing one message on the private link.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("i/o error on the query link: {0}")]
    Io(#[from] std::io::Error),

    #[error("no data within {0:?}")]
    Timeout(Duration),

    #[error("message exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("peer closed the connection before sending a message")]
    Closed,
}

/// Client side of a lookup.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to query server at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("query server at {addr} did not answer within {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Malformed(#[from] MalformedResponse),
}

/// Errors that stop the server or abort a single connection.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The global log subscriber could not be installed.
#[derive(Debug, Error)]
#[error("failed to install log subscriber: {0}")]
pub struct LoggingError(pub String);
