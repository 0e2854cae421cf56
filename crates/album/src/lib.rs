use std::error;
use std::fmt;

use flickr::ApiError;
use model::Pin;
use utility::id::Id;

pub mod album;
pub mod store;

pub use album::{Album, DEFAULT_PER_PAGE};
pub use store::{AlbumStore, MemoryStore, StoreError};

#[derive(Debug)]
pub enum AlbumError {
    PinNotFound(Id<Pin>),
    Api(ApiError),
    Store(StoreError),
}

pub type AlbumResult<T> = Result<T, AlbumError>;

impl error::Error for AlbumError {}

impl fmt::Display for AlbumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlbumError::PinNotFound(id) => write!(f, "Pin {} does not exist", id),
            AlbumError::Api(e) => write!(f, "{}", e),
            AlbumError::Store(e) => write!(f, "Album store error: {}", e),
        }
    }
}

impl From<ApiError> for AlbumError {
    fn from(e: ApiError) -> Self {
        AlbumError::Api(e)
    }
}

impl From<StoreError> for AlbumError {
    fn from(e: StoreError) -> Self {
        AlbumError::Store(e)
    }
}
