use model::{Photo, PhotoPage};
use rand::Rng;

use crate::response::SearchResponse;
use crate::{ApiError, FlickrClient};

pub const SEARCH_METHOD: &str = "flickr.photos.search";

/// Extra field that makes Flickr include the medium image URL.
pub const EXTRAS_MEDIUM_URL: &str = "url_m";

/// Flickr never returns more than this many results for one search,
/// regardless of how many pages it reports.
pub const MAX_SEARCH_RESULTS: u32 = 4000;

/// Which page of the results to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPage {
    /// Leave the page out and let the server start at the beginning.
    First,
    Fixed(u32),
    /// A uniformly drawn page, for a fresh set of photos at the same place.
    /// `known_pages` is the page count from an earlier search, if any.
    Random { known_pages: Option<u32> },
}

impl SearchPage {
    pub fn resolve(self, per_page: u32) -> Option<u32> {
        match self {
            SearchPage::First => None,
            SearchPage::Fixed(page) => Some(page),
            SearchPage::Random { known_pages } => Some(random_page(known_pages, per_page)),
        }
    }
}

/// Highest page that can hold results, given Flickr's search ceiling.
pub fn max_page(known_pages: Option<u32>, per_page: u32) -> u32 {
    let reachable = (MAX_SEARCH_RESULTS / per_page.max(1)).max(1);
    match known_pages {
        Some(pages) => pages.clamp(1, reachable),
        None => reachable,
    }
}

pub fn random_page(known_pages: Option<u32>, per_page: u32) -> u32 {
    rand::thread_rng().gen_range(1..=max_page(known_pages, per_page))
}

impl FlickrClient {
    /// Search photos inside `bbox` (`minLon,minLat,maxLon,maxLat`).
    ///
    /// One request, one page. A single malformed entry fails the whole call.
    pub async fn search(
        &self,
        bbox: &str,
        page: Option<u32>,
        per_page: u32,
    ) -> Result<Vec<Photo>, ApiError> {
        let params = search_params(bbox, page, per_page);
        let response: SearchResponse = self.get(SEARCH_METHOD, &params).await?;
        Ok(response.photos.photo.into_iter().map(Photo::from).collect())
    }

    /// Like [`FlickrClient::search`], but keeps the paging info of the response.
    pub async fn search_page(
        &self,
        bbox: &str,
        page: SearchPage,
        per_page: u32,
    ) -> Result<PhotoPage, ApiError> {
        let params = search_params(bbox, page.resolve(per_page), per_page);
        let response: SearchResponse = self.get(SEARCH_METHOD, &params).await?;
        let page = PhotoPage::from(response.photos);
        log::info!(
            "found {} photos in {} (page {} of {})",
            page.photos.len(),
            bbox,
            page.page,
            page.pages
        );
        Ok(page)
    }
}

fn search_params(bbox: &str, page: Option<u32>, per_page: u32) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("bbox", bbox.to_owned()),
        ("extras", EXTRAS_MEDIUM_URL.to_owned()),
        ("per_page", per_page.to_string()),
    ];
    if let Some(page) = page {
        params.push(("page", page.to_string()));
    }
    params
}
