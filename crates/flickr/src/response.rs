use model::{Photo, PhotoPage};
use serde::{Deserialize, Deserializer};

/// Top level fields Flickr puts into every response.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusBody {
    pub stat: Option<String>,
    pub code: Option<i64>,
    message: Option<String>,
    status_message: Option<String>,
}

impl StatusBody {
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.status_message.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub photos: PhotosBody,
}

/// `photos` object of a `flickr.photos.search` response.
///
/// Paging fields are optional, Flickr sends counts as numbers or as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotosBody {
    #[serde(default, deserialize_with = "count")]
    pub page: u64,
    #[serde(default, deserialize_with = "count")]
    pub pages: u64,
    #[serde(default, rename = "perpage", deserialize_with = "count")]
    pub per_page: u64,
    #[serde(default, deserialize_with = "count")]
    pub total: u64,
    pub photo: Vec<PhotoEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoEntry {
    pub id: String,
    pub title: String,
    pub url_m: String,
}

impl From<PhotoEntry> for Photo {
    fn from(entry: PhotoEntry) -> Self {
        Photo::new(entry.id, entry.title, entry.url_m)
    }
}

impl From<PhotosBody> for PhotoPage {
    fn from(body: PhotosBody) -> Self {
        PhotoPage {
            page: saturate(body.page),
            pages: saturate(body.pages),
            per_page: saturate(body.per_page),
            total: body.total,
            photos: body.photo.into_iter().map(Photo::from).collect(),
        }
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
