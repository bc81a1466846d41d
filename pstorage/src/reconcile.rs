use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{PriceChange, ProductCandidate, ProductRecord};
use crate::store::ProductStore;

/// What reconciling one candidate did to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Inserted,
    Updated {
        previous_price: f64,
        times_changed: i64,
    },
    Unchanged,
}

impl ReconcileOutcome {
    /// True when a store mutation actually happened.
    pub fn applied(&self) -> bool {
        !matches!(self, ReconcileOutcome::Unchanged)
    }
}

/// Decides and applies the catalog mutation for one incoming row.
///
/// Store failures are returned, never retried.
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(
        &self,
        candidate: &ProductCandidate,
        request_time: i64,
    ) -> Result<ReconcileOutcome>;
}

/// Production reconciler: look up by product name, then insert, update the
/// price, or leave the document alone.
pub struct StoreReconciler {
    store: Arc<dyn ProductStore>,
}

impl StoreReconciler {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Reconciler for StoreReconciler {
    async fn reconcile(
        &self,
        candidate: &ProductCandidate,
        request_time: i64,
    ) -> Result<ReconcileOutcome> {
        let Some(existing) = self.store.find_one(&candidate.product).await? else {
            let record = ProductRecord::first_sighting(candidate, request_time);
            self.store.insert_one(&record).await?;
            log::debug!("Inserted '{}' at {}", candidate.product, candidate.price);
            return Ok(ReconcileOutcome::Inserted);
        };

        // Exact comparison: any representable difference counts as a change.
        if existing.price == candidate.price {
            return Ok(ReconcileOutcome::Unchanged);
        }

        let change = PriceChange {
            price: candidate.price,
            times_changed: existing.times_changed + 1,
            request_time,
        };
        self.store.update_one(&candidate.product, &change).await?;
        log::debug!(
            "Updated '{}' price {} -> {} (change #{})",
            candidate.product,
            existing.price,
            candidate.price,
            change.times_changed
        );

        Ok(ReconcileOutcome::Updated {
            previous_price: existing.price,
            times_changed: change.times_changed,
        })
    }
}
