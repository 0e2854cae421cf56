use std::collections::{BTreeMap, HashMap};
use std::{error, fmt, result};

use async_trait::async_trait;
use model::{Photo, Pin};
use tokio::sync::RwLock;
use utility::geo::Coordinate;
use utility::id::Id;

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Other(Box<dyn error::Error + Send + Sync>),
}

impl error::Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "not found"),
            StoreError::Other(why) => write!(f, "{}", why),
        }
    }
}

pub type Result<T> = result::Result<T, StoreError>;

/// Persistence for pins and the photos attached to them.
#[async_trait]
pub trait AlbumStore: Send + Sync {
    async fn insert_pin(&self, coordinate: Coordinate) -> Result<Pin>;
    async fn pin(&self, id: &Id<Pin>) -> Result<Pin>;
    async fn pins(&self) -> Result<Vec<Pin>>;
    /// Remove a pin together with its photos, returning the removed photos.
    async fn remove_pin(&self, id: &Id<Pin>) -> Result<Vec<Photo>>;

    async fn photos(&self, pin: &Id<Pin>) -> Result<Vec<Photo>>;
    /// Attach photos to a pin. Photos the pin already holds are skipped.
    async fn insert_photos(&self, pin: &Id<Pin>, photos: Vec<Photo>) -> Result<()>;
    /// Detach photos from a pin, returning the ones that were attached.
    async fn remove_photos(&self, pin: &Id<Pin>, ids: &[Id<Photo>]) -> Result<Vec<Photo>>;
    /// Whether any pin still holds this photo.
    async fn is_photo_referenced(&self, id: &Id<Photo>) -> Result<bool>;
}

#[derive(Default)]
struct MemoryState {
    next_pin: u64,
    pins: BTreeMap<Id<Pin>, Pin>,
    photos: HashMap<Id<Pin>, Vec<Photo>>,
}

/// An [`AlbumStore`] that lives as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlbumStore for MemoryStore {
    async fn insert_pin(&self, coordinate: Coordinate) -> Result<Pin> {
        let mut state = self.state.write().await;
        state.next_pin += 1;
        let pin = Pin::new(Id::new(state.next_pin), coordinate);
        state.pins.insert(pin.id, pin.clone());
        state.photos.insert(pin.id, Vec::new());
        Ok(pin)
    }

    async fn pin(&self, id: &Id<Pin>) -> Result<Pin> {
        self.state
            .read()
            .await
            .pins
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn pins(&self) -> Result<Vec<Pin>> {
        Ok(self.state.read().await.pins.values().cloned().collect())
    }

    async fn remove_pin(&self, id: &Id<Pin>) -> Result<Vec<Photo>> {
        let mut state = self.state.write().await;
        state.pins.remove(id).ok_or(StoreError::NotFound)?;
        Ok(state.photos.remove(id).unwrap_or_default())
    }

    async fn photos(&self, pin: &Id<Pin>) -> Result<Vec<Photo>> {
        self.state
            .read()
            .await
            .photos
            .get(pin)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_photos(&self, pin: &Id<Pin>, photos: Vec<Photo>) -> Result<()> {
        let mut state = self.state.write().await;
        let attached = state.photos.get_mut(pin).ok_or(StoreError::NotFound)?;
        for photo in photos {
            if !attached.iter().any(|known| known.id == photo.id) {
                attached.push(photo);
            }
        }
        Ok(())
    }

    async fn remove_photos(&self, pin: &Id<Pin>, ids: &[Id<Photo>]) -> Result<Vec<Photo>> {
        let mut state = self.state.write().await;
        let attached = state.photos.get_mut(pin).ok_or(StoreError::NotFound)?;
        let (removed, kept) = attached
            .drain(..)
            .partition::<Vec<_>, _>(|photo| ids.contains(&photo.id));
        *attached = kept;
        Ok(removed)
    }

    async fn is_photo_referenced(&self, id: &Id<Photo>) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .photos
            .values()
            .flatten()
            .any(|photo| photo.id == *id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate() -> Coordinate {
        Coordinate::new(54.32, 10.13).unwrap()
    }

    #[tokio::test]
    async fn pins_get_increasing_ids() {
        let store = MemoryStore::new();
        let first = store.insert_pin(coordinate()).await.unwrap();
        let second = store.insert_pin(coordinate()).await.unwrap();
        assert!(first.id.raw() < second.id.raw());
        assert_eq!(store.pins().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn insert_photos_skips_duplicates() {
        let store = MemoryStore::new();
        let pin = store.insert_pin(coordinate()).await.unwrap();
        let photo = Photo::new("1", "a", "http://x/1.jpg");

        store.insert_photos(&pin.id, vec![photo.clone()]).await.unwrap();
        store
            .insert_photos(&pin.id, vec![photo.clone(), Photo::new("2", "b", "http://x/2.jpg")])
            .await
            .unwrap();

        let ids: Vec<_> = store
            .photos(&pin.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id.raw())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn remove_photos_returns_only_attached() {
        let store = MemoryStore::new();
        let pin = store.insert_pin(coordinate()).await.unwrap();
        store
            .insert_photos(
                &pin.id,
                vec![Photo::new("1", "a", "http://x/1.jpg"), Photo::new("2", "b", "http://x/2.jpg")],
            )
            .await
            .unwrap();

        let removed = store
            .remove_photos(&pin.id, &[Id::new("2".to_owned()), Id::new("9".to_owned())])
            .await
            .unwrap();

        assert_eq!(removed, vec![Photo::new("2", "b", "http://x/2.jpg")]);
        assert_eq!(store.photos(&pin.id).await.unwrap().len(), 1);
        assert!(!store.is_photo_referenced(&Id::new("2".to_owned())).await.unwrap());
        assert!(store.is_photo_referenced(&Id::new("1".to_owned())).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_pin_is_not_found() {
        let store = MemoryStore::new();
        let missing = Id::new(7);
        assert!(matches!(store.pin(&missing).await, Err(StoreError::NotFound)));
        assert!(matches!(store.remove_pin(&missing).await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.insert_photos(&missing, vec![]).await,
            Err(StoreError::NotFound)
        ));
    }
}
