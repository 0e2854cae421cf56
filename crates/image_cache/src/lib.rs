use std::{
    env,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use sha2::{Digest, Sha256};

pub const CACHE_DIR_ENV: &str = "VIRTUAL_TOURIST_CACHE_DIR";

/// Raw image bytes on disk, keyed by an identifier.
///
/// There is no size bound and no expiry: an entry lives until it is evicted.
/// Every I/O failure is logged and then treated like a missing entry, the
/// image can always be fetched again from its source.
#[derive(Debug)]
pub struct ImageCache {
    dir: PathBuf,
    write_counter: AtomicU64,
}

impl ImageCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            write_counter: AtomicU64::new(0),
        }
    }

    /// Cache directory from `VIRTUAL_TOURIST_CACHE_DIR`, falling back to the
    /// platform cache directory.
    pub fn from_env() -> Option<Self> {
        let dir = match env::var_os(CACHE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()?.join("virtual_tourist").join("images"),
        };
        Some(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the bytes for `id`. The id is hashed so any string is
    /// a safe file name.
    pub fn path_for(&self, id: &str) -> PathBuf {
        let digest = Sha256::digest(id.as_bytes());
        self.dir.join(hex::encode(digest))
    }

    pub async fn get(&self, id: &str) -> Option<Vec<u8>> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                log::debug!("image cache hit for '{id}'");
                Some(bytes)
            }
            Err(why) if why.kind() == ErrorKind::NotFound => None,
            Err(why) => {
                log::warn!("could not read cached image '{id}' at {path:?}: {why}");
                None
            }
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        tokio::fs::try_exists(self.path_for(id))
            .await
            .unwrap_or(false)
    }

    /// Store `bytes` for `id`, replacing what was there.
    ///
    /// Written to a temporary file first and renamed into place, so a reader
    /// sees either the old or the new image. Concurrent writers for one id:
    /// the last rename wins.
    pub async fn put(&self, id: &str, bytes: &[u8]) {
        if let Err(why) = self.try_put(id, bytes).await {
            log::warn!("could not cache image '{id}': {why}");
        }
    }

    async fn try_put(&self, id: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(id);
        let sequence = self.write_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("{}.{sequence}.tmp", std::process::id()));

        tokio::fs::write(&temp_path, bytes).await?;
        if let Err(why) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(why);
        }
        log::debug!("cached {} bytes for '{id}'", bytes.len());
        Ok(())
    }

    /// Drop the bytes for `id`. Evicting something that is not cached is fine.
    pub async fn evict(&self, id: &str) {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => log::debug!("evicted cached image '{id}'"),
            Err(why) if why.kind() == ErrorKind::NotFound => {}
            Err(why) => log::warn!("could not evict cached image '{id}': {why}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_hashed_inside_cache_dir() {
        let cache = ImageCache::new("/tmp/images");
        let path = cache.path_for("../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/tmp/images")));
        assert_eq!(path.file_name().unwrap().len(), 64);
        assert_ne!(cache.path_for("1"), cache.path_for("2"));
    }
}
