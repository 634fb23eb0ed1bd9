use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::voters::store::{LoadError, VoterStore};

/// Loads the voter file once per process and hands out the shared store.
///
/// A failed load is not cached; the next caller retries.
#[derive(Debug)]
pub struct VoterCache {
    path: PathBuf,
    store: OnceCell<Arc<VoterStore>>,
}

impl VoterCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> Result<Arc<VoterStore>, LoadError> {
        self.store
            .get_or_try_init(|| async {
                info!("Loading voter file {}", self.path.display());
                let path = self.path.clone();
                let store = tokio::task::spawn_blocking(move || VoterStore::load(&path))
                    .await
                    .map_err(|e| LoadError::Io {
                        path: self.path.clone(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, e),
                    })??;
                Ok::<_, LoadError>(Arc::new(store))
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::voters::store::test_data::VOTER_CSV;

    #[tokio::test]
    async fn test_cache_loads_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VOTER_CSV.as_bytes()).unwrap();
        let cache = VoterCache::new(file.path());

        let first = cache.get().await.unwrap();
        // Later edits to the file are not observed: the source is immutable for the process.
        file.as_file().set_len(0).unwrap();
        let second = cache.get().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 6);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voters.csv");
        let cache = VoterCache::new(&path);

        assert!(matches!(
            cache.get().await.unwrap_err(),
            LoadError::NotFound { .. }
        ));

        std::fs::write(&path, VOTER_CSV).unwrap();
        assert_eq!(cache.get().await.unwrap().len(), 6);
    }
}
