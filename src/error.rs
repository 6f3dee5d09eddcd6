use std::path::PathBuf;

use thiserror::Error;

/// Flickr error code returned when a listing has no more results.
pub const NO_MORE_RESULTS: u32 = 1;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not decode response: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with `stat: fail`.
    #[error("Flickr API error {code}: {message}")]
    Api { code: u32, message: String },

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Could not use token file {path}: {reason}")]
    Token { path: PathBuf, reason: String },

    #[error("Authorization was not completed")]
    AuthorizationIncomplete,

    #[error("Invalid capture time '{0}'")]
    Timestamp(String),

    #[error("Unknown naming mode '{name}', expected one of: {valid}")]
    UnknownNamingMode { name: String, valid: String },

    #[error("No downloadable size for photo {0}")]
    NoSource(String),
}

impl Error {
    pub fn is_no_more_results(&self) -> bool {
        matches!(self, Error::Api { code, .. } if *code == NO_MORE_RESULTS)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
