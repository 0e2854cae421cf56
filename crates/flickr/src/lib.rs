use std::error;
use std::fmt;
use std::sync::Arc;

pub mod client;
pub mod loader;
pub mod response;
pub mod search;

pub use client::{FlickrClient, FlickrCredentials, HttpResponse, ReqwestTransport, Transport};
pub use loader::PhotoLoader;
pub use search::SearchPage;

/// Coarse classification of an [`ApiError`], for callers deciding whether to
/// retry or to give up on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never produced a response.
    Transport,
    /// The server answered, but with a failure.
    Server,
    /// The response could not be decoded into records, or a URL taken from
    /// one (such as a photo's image URL) could not be parsed.
    Parse,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    RequestError(Arc<dyn error::Error + Send + Sync>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        message: Option<String>,
    },
    /// Flickr answered `"stat": "fail"` with a success status code.
    Flickr {
        code: Option<i64>,
        message: String,
    },
    JsonError(Arc<serde_json::Error>),
    InvalidUrl(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::RequestError(_) => ErrorKind::Transport,
            ApiError::InvalidResponse { .. } | ApiError::Flickr { .. } => ErrorKind::Server,
            ApiError::JsonError(_) | ApiError::InvalidUrl(_) => ErrorKind::Parse,
        }
    }
}

impl error::Error for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            ApiError::InvalidResponse {
                status_code,
                url,
                message,
            } => match message {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response ({}) {}", status_code, url),
            },
            ApiError::Flickr { code, message } => match code {
                Some(code) => write!(f, "Flickr error {}: {}", code, message),
                None => write!(f, "Flickr error: {}", message),
            },
            ApiError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            ApiError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::RequestError(Arc::new(e))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::JsonError(Arc::new(e))
    }
}
