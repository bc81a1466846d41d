pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod pager;
pub mod query;
pub mod reconcile;
pub mod store;

use crate::catalog::Catalog;
use crate::config::StorageConfig;
use crate::errors::Result;
use crate::query::CatalogQuery;
use crate::reconcile::{Reconciler, StoreReconciler};
use crate::store::ProductStore;
use std::sync::Arc;

/// The main entry point for the `pstorage` library.
///
/// `PStorage` owns the product catalog and hands out the components built on
/// top of it:
/// - the raw document-style store (`ProductStore`),
/// - the reconciliation engine used by price-list ingestion (`Reconciler`),
/// - the sorted, paginated query façade (`CatalogQuery`).
///
/// # Example
///
/// ```rust,no_run
/// use pstorage::{PStorage, config::StorageConfig};
/// use tempfile::tempdir;
///
/// #[tokio::main]
/// async fn main() {
///     let dir = tempdir().unwrap();
///     let config = StorageConfig::new(dir.path());
///     let storage = PStorage::new(config).await.unwrap();
///
///     let reconciler = storage.reconciler();
///     let query = storage.query();
/// }
/// ```
pub struct PStorage {
    pub config: StorageConfig,
    pub catalog: Arc<Catalog>,
}

impl PStorage {
    /// Opens (creating if needed) the SQLite catalog and its schema.
    pub async fn new(config: StorageConfig) -> Result<Self> {
        if let Some(parent) = config.catalog_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let catalog = Arc::new(Catalog::new(&config)?);
        catalog.initialize_schema()?;
        log::info!("Catalog ready at {}", config.catalog_path.display());

        Ok(Self { config, catalog })
    }

    pub fn store(&self) -> Arc<dyn ProductStore> {
        Arc::clone(&self.catalog) as Arc<dyn ProductStore>
    }

    pub fn reconciler(&self) -> Arc<dyn Reconciler> {
        Arc::new(StoreReconciler::new(self.store()))
    }

    pub fn query(&self) -> CatalogQuery {
        CatalogQuery::new(self.store(), self.config.request_timeout)
    }
}
