use crate::config::StorageConfig;
use crate::errors::{Result, StorageError};
use crate::models::{PriceChange, ProductRecord, SortSpec};
use crate::store::ProductStore;
use anyhow::anyhow;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task;

/// SQLite-backed product catalog.
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

const PRODUCT_COLUMNS: &str = "product, price, times_changed, request_time";

impl Catalog {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        if let Some(parent) = config.catalog_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&config.catalog_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Other(anyhow!("catalog connection lock poisoned")))
    }

    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS products (
                product TEXT PRIMARY KEY NOT NULL,
                price REAL NOT NULL,
                times_changed INTEGER NOT NULL DEFAULT 0,
                request_time INTEGER NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn get_product(&self, product: &str) -> Result<Option<ProductRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product = ?1"
        ))?;
        let record = stmt
            .query_row(params![product], map_product_row)
            .optional()?;
        Ok(record)
    }

    pub fn insert_product(&self, record: &ProductRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO products (product, price, times_changed, request_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.product,
                record.price,
                record.times_changed,
                record.request_time,
            ],
        )?;
        Ok(())
    }

    pub fn update_product_price(&self, product: &str, change: &PriceChange) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE products SET price = ?1, times_changed = ?2, request_time = ?3
             WHERE product = ?4",
            params![change.price, change.times_changed, change.request_time, product],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(product.to_string()));
        }
        Ok(())
    }

    pub fn list_sorted(&self, sort: SortSpec) -> Result<Vec<ProductRecord>> {
        let conn = self.lock()?;
        // Both fragments come from closed enums, never from request text.
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY {} {}",
            sort.column.sql_column(),
            sort.direction.sql_keyword()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_product_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count_products(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn delete_product(&self, product: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM products WHERE product = ?1", params![product])?;
        Ok(deleted > 0)
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Catalog) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let catalog = self.clone();
        task::spawn_blocking(move || op(&catalog)).await?
    }
}

fn map_product_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductRecord> {
    Ok(ProductRecord {
        product: row.get(0)?,
        price: row.get(1)?,
        times_changed: row.get(2)?,
        request_time: row.get(3)?,
    })
}

#[async_trait]
impl ProductStore for Catalog {
    async fn find_one(&self, product: &str) -> Result<Option<ProductRecord>> {
        let product = product.to_string();
        self.blocking(move |catalog| catalog.get_product(&product))
            .await
    }

    async fn insert_one(&self, record: &ProductRecord) -> Result<()> {
        let record = record.clone();
        self.blocking(move |catalog| catalog.insert_product(&record))
            .await
    }

    async fn update_one(&self, product: &str, change: &PriceChange) -> Result<()> {
        let product = product.to_string();
        let change = change.clone();
        self.blocking(move |catalog| catalog.update_product_price(&product, &change))
            .await
    }

    async fn find_sorted(&self, sort: SortSpec) -> Result<Vec<ProductRecord>> {
        self.blocking(move |catalog| catalog.list_sorted(sort)).await
    }

    async fn count(&self) -> Result<i64> {
        self.blocking(|catalog| catalog.count_products()).await
    }

    async fn delete_one(&self, product: &str) -> Result<bool> {
        let product = product.to_string();
        self.blocking(move |catalog| catalog.delete_product(&product))
            .await
    }
}
