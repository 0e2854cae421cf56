use std::collections::HashMap;
use std::sync::Arc;

use flickr::{FlickrClient, PhotoLoader, SearchPage};
use image_cache::ImageCache;
use model::{Photo, Pin};
use tokio::sync::RwLock;
use utility::geo::Coordinate;
use utility::id::Id;

use crate::store::{AlbumStore, StoreError};
use crate::{AlbumError, AlbumResult};

/// Photos requested per album page.
pub const DEFAULT_PER_PAGE: u32 = 21;

/// Pins, their photo albums and the cached images behind them.
///
/// Deleting a photo, directly or through its pin, also drops its cached image
/// once no other pin holds the same photo.
pub struct Album<S: AlbumStore> {
    store: S,
    client: Arc<FlickrClient>,
    loader: PhotoLoader,
    per_page: u32,
    known_pages: RwLock<HashMap<Id<Pin>, u32>>,
}

impl<S: AlbumStore> Album<S> {
    pub fn new(store: S, client: Arc<FlickrClient>, cache: Arc<ImageCache>) -> Self {
        Self {
            store,
            loader: PhotoLoader::new(client.clone(), cache),
            client,
            per_page: DEFAULT_PER_PAGE,
            known_pages: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn drop_pin(&self, coordinate: Coordinate) -> AlbumResult<Pin> {
        let pin = self.store.insert_pin(coordinate).await?;
        log::info!(
            "dropped pin {} at {},{}",
            pin.id,
            coordinate.latitude(),
            coordinate.longitude()
        );
        Ok(pin)
    }

    pub async fn pins(&self) -> AlbumResult<Vec<Pin>> {
        Ok(self.store.pins().await?)
    }

    /// The album of a pin. The first page is searched only when the pin has
    /// no photos yet; afterwards the stored photos are returned.
    pub async fn photos(&self, pin_id: &Id<Pin>) -> AlbumResult<Vec<Photo>> {
        let pin = self.pin(pin_id).await?;
        let stored = self.store.photos(&pin.id).await?;
        if !stored.is_empty() {
            return Ok(stored);
        }
        self.fill(&pin, SearchPage::First).await
    }

    /// Replace the album of a pin with a random page of results.
    pub async fn new_collection(&self, pin_id: &Id<Pin>) -> AlbumResult<Vec<Photo>> {
        let known_pages = self.known_pages.read().await.get(pin_id).copied();
        self.replace_collection(pin_id, SearchPage::Random { known_pages }).await
    }

    /// Replace the album of a pin with the given page of results. The current
    /// photos are kept when the search fails.
    pub async fn replace_collection(
        &self,
        pin_id: &Id<Pin>,
        page: SearchPage,
    ) -> AlbumResult<Vec<Photo>> {
        let pin = self.pin(pin_id).await?;
        let found = self.search(&pin, page).await?;

        let ids: Vec<_> = self
            .store
            .photos(&pin.id)
            .await?
            .into_iter()
            .map(|photo| photo.id)
            .collect();
        let removed = self.store.remove_photos(&pin.id, &ids).await?;
        self.store.insert_photos(&pin.id, found).await?;
        self.evict(&removed).await?;
        Ok(self.store.photos(&pin.id).await?)
    }

    /// The image of a photo. An image loaded for a photo no pin holds any
    /// more is not kept in the cache.
    pub async fn image(&self, photo: &Photo) -> AlbumResult<Vec<u8>> {
        let bytes = self.loader.image(photo).await?;
        if !self.store.is_photo_referenced(&photo.id).await? {
            self.loader.evict(photo.cache_key()).await;
        }
        Ok(bytes)
    }

    /// Delete the given photos from a pin's album, returning how many were removed.
    pub async fn delete_photos(&self, pin_id: &Id<Pin>, ids: &[Id<Photo>]) -> AlbumResult<usize> {
        let pin = self.pin(pin_id).await?;
        let removed = self.store.remove_photos(&pin.id, ids).await?;
        self.evict(&removed).await?;
        Ok(removed.len())
    }

    pub async fn remove_pin(&self, pin_id: &Id<Pin>) -> AlbumResult<()> {
        let removed = self.store.remove_pin(pin_id).await.map_err(|why| match why {
            StoreError::NotFound => AlbumError::PinNotFound(*pin_id),
            other => AlbumError::Store(other),
        })?;
        self.known_pages.write().await.remove(pin_id);
        self.evict(&removed).await?;
        log::info!("removed pin {} with {} photos", pin_id, removed.len());
        Ok(())
    }

    async fn pin(&self, pin_id: &Id<Pin>) -> AlbumResult<Pin> {
        self.store.pin(pin_id).await.map_err(|why| match why {
            StoreError::NotFound => AlbumError::PinNotFound(*pin_id),
            other => AlbumError::Store(other),
        })
    }

    async fn fill(&self, pin: &Pin, page: SearchPage) -> AlbumResult<Vec<Photo>> {
        let found = self.search(pin, page).await?;
        self.store.insert_photos(&pin.id, found).await?;
        Ok(self.store.photos(&pin.id).await?)
    }

    async fn search(&self, pin: &Pin, page: SearchPage) -> AlbumResult<Vec<Photo>> {
        let bbox = pin.bounding_box().to_string();
        let result = self.client.search_page(&bbox, page, self.per_page).await?;
        if result.pages > 0 {
            self.known_pages.write().await.insert(pin.id, result.pages);
        }
        Ok(result.photos)
    }

    async fn evict(&self, removed: &[Photo]) -> AlbumResult<()> {
        for photo in removed {
            if !self.store.is_photo_referenced(&photo.id).await? {
                self.loader.evict(photo.cache_key()).await;
            }
        }
        Ok(())
    }
}
