use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

/// Metadata of one remote photo, as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Id<Photo>,
    pub title: String,
    pub image_url: String,
}

impl HasId for Photo {
    type IdType = String;
}

impl Photo {
    pub fn new<I, T, U>(id: I, title: T, image_url: U) -> Self
    where
        I: Into<String>,
        T: Into<String>,
        U: Into<String>,
    {
        Self {
            id: Id::new(id.into()),
            title: title.into(),
            image_url: image_url.into(),
        }
    }

    /// Key under which the image bytes of this photo are cached.
    ///
    /// Always the photo id. The file name in `image_url` is not used, it
    /// differs between size variants of the same photo.
    pub fn cache_key(&self) -> &str {
        self.id.raw_ref()
    }
}

/// One page of search results together with the paging info Flickr reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPage {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub total: u64,
    pub photos: Vec<Photo>,
}

impl PhotoPage {
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}
