use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{PriceChange, ProductRecord, SortSpec};

/// Document-collection view of the product catalog.
///
/// Every call is a fallible remote-style operation. Single-document writes are
/// atomic; nothing spans more than one document.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Exact-match lookup by product name.
    async fn find_one(&self, product: &str) -> Result<Option<ProductRecord>>;

    /// Inserts a new document. Fails if the product key already exists.
    async fn insert_one(&self, record: &ProductRecord) -> Result<()>;

    /// Overwrites the price fields of an existing document.
    async fn update_one(&self, product: &str, change: &PriceChange) -> Result<()>;

    /// Returns the whole catalog ordered by `sort`. Ties keep store order.
    async fn find_sorted(&self, sort: SortSpec) -> Result<Vec<ProductRecord>>;

    async fn count(&self) -> Result<i64>;

    /// Administrative removal; returns whether a document was deleted.
    async fn delete_one(&self, product: &str) -> Result<bool>;
}
