use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use image_cache::ImageCache;
use model::Photo;

use crate::{ApiError, FlickrClient};

/// Serves photo images from the cache, fetching and storing them on a miss.
///
/// Loads for the same photo are serialised, so an image is downloaded once
/// even when several callers ask for it at the same time.
pub struct PhotoLoader {
    client: Arc<FlickrClient>,
    cache: Arc<ImageCache>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PhotoLoader {
    pub fn new(client: Arc<FlickrClient>, cache: Arc<ImageCache>) -> Self {
        Self {
            client,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    pub async fn image(&self, photo: &Photo) -> Result<Vec<u8>, ApiError> {
        let key = photo.cache_key();
        if let Some(bytes) = self.cache.get(key).await {
            return Ok(bytes);
        }

        let slot = self.slot(key);
        let _held = slot.lock.lock().await;
        self.load(photo).await
    }

    /// Load all images concurrently. Results are in the order of `photos`.
    pub async fn prefetch(&self, photos: &[Photo]) -> Vec<Result<Vec<u8>, ApiError>> {
        futures::future::join_all(photos.iter().map(|photo| self.image(photo))).await
    }

    /// Drop the cached image of a photo. Waits for a load of the same photo
    /// that is in flight, so its write can not land after the eviction.
    pub async fn evict(&self, key: &str) {
        let slot = self.slot(key);
        let _held = slot.lock.lock().await;
        self.cache.evict(key).await;
    }

    // runs with the per-photo slot held
    async fn load(&self, photo: &Photo) -> Result<Vec<u8>, ApiError> {
        let key = photo.cache_key();
        if let Some(bytes) = self.cache.get(key).await {
            return Ok(bytes);
        }

        let bytes = self.client.fetch_image(&photo.image_url).await?;
        self.cache.put(key, &bytes).await;
        log::info!("fetched image for photo {} ({} bytes)", photo.id, bytes.len());
        Ok(bytes)
    }

    fn slot(&self, key: &str) -> Slot<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let lock = in_flight.entry(key.to_owned()).or_default().clone();
        Slot {
            loader: self,
            key: key.to_owned(),
            lock,
        }
    }

    fn release(&self, key: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // one reference in the map, one held by the releasing slot
        let unused = in_flight
            .get(key)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) <= 2);
        if unused {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

/// A claim on the per-photo lock. Dropping it, also when the owning future
/// is cancelled, removes the entry once nobody else uses it.
struct Slot<'a> {
    loader: &'a PhotoLoader,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.loader.release(&self.key, &self.lock);
    }
}
