use std::future::Future;
use std::path::{Path, PathBuf};

use pack_engine::PackSize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog io: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the offered pack sizes live between requests.
pub trait CatalogProvider: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<Vec<PackSize>, CatalogError>> + Send;

    fn save(&self, sizes: Vec<PackSize>) -> impl Future<Output = Result<(), CatalogError>> + Send;
}

/// Pack sizes stored as a JSON array of `{"maxItems": n}` records.
#[derive(Debug)]
pub struct JsonFileCatalog {
    path: PathBuf,
    /// Held across the staging write and the rename. Saves share one staging
    /// file, so only one may be in flight.
    write_lock: Mutex<()>,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileCatalog {
        JsonFileCatalog {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> std::io::Result<bool> {
        tokio::fs::try_exists(&self.path).await
    }
}

impl CatalogProvider for JsonFileCatalog {
    async fn load(&self) -> Result<Vec<PackSize>, CatalogError> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // written to a sibling file first so readers never see a half-written catalog
    async fn save(&self, sizes: Vec<PackSize>) -> Result<(), CatalogError> {
        let json = serde_json::to_vec(&sizes)?;
        let _lock = self.write_lock.lock().await;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

/// Pack sizes held in memory, lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    sizes: RwLock<Vec<PackSize>>,
}

impl InMemoryCatalog {
    pub fn new(sizes: impl IntoIterator<Item = u64>) -> InMemoryCatalog {
        InMemoryCatalog {
            sizes: RwLock::new(sizes.into_iter().map(PackSize::new).collect()),
        }
    }
}

impl CatalogProvider for InMemoryCatalog {
    async fn load(&self) -> Result<Vec<PackSize>, CatalogError> {
        Ok(self.sizes.read().await.clone())
    }

    async fn save(&self, sizes: Vec<PackSize>) -> Result<(), CatalogError> {
        *self.sizes.write().await = sizes;
        Ok(())
    }
}
