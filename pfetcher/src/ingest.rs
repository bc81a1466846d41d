use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pstorage::reconcile::{ReconcileOutcome, Reconciler};
use tokio::time::{timeout_at, Instant};

use crate::client::{ContentFetcher, HttpContentFetcher};
use crate::config::FetchConfig;
use crate::error::{IngestFailure, PriceListError};
use crate::parser::PriceListReader;

/// Tally of one successful ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows that caused a store mutation (`inserted + updated`).
    pub applied: u64,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
}

impl IngestReport {
    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Inserted => self.inserted += 1,
            ReconcileOutcome::Updated { .. } => self.updated += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
        if outcome.applied() {
            self.applied += 1;
        }
    }
}

/// Fetch → parse → reconcile pipeline for remote price lists.
pub struct PriceListIngestor {
    fetcher: Arc<dyn ContentFetcher>,
    reconciler: Arc<dyn Reconciler>,
    store_timeout: Duration,
}

impl PriceListIngestor {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        reconciler: Arc<dyn Reconciler>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            reconciler,
            store_timeout,
        }
    }

    pub fn with_default_client(
        config: &FetchConfig,
        reconciler: Arc<dyn Reconciler>,
        store_timeout: Duration,
    ) -> Result<Self, PriceListError> {
        let fetcher = HttpContentFetcher::new(config)?;
        Ok(Self::new(Arc::new(fetcher), reconciler, store_timeout))
    }

    /// Runs the whole pipeline for `url`.
    ///
    /// The scratch file holding the download is removed before this returns,
    /// on success and on failure.
    pub async fn ingest(&self, url: &str) -> Result<IngestReport, IngestFailure> {
        let scratch = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|err| IngestFailure::new(0, err))?;
        log::info!("Starting to parse {}", scratch.path().display());

        let report = self.ingest_file(scratch.path()).await;
        drop(scratch);
        report
    }

    /// Parses a local price list and reconciles it row by row.
    ///
    /// Stops at the first invalid row or store failure; the rows already
    /// applied stay applied and their count travels with the error. All store
    /// calls of the run share one `store_timeout` budget.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, IngestFailure> {
        let request_time = Utc::now().timestamp();
        let deadline = Instant::now() + self.store_timeout;
        let rows = PriceListReader::open(path).map_err(|err| IngestFailure::new(0, err))?;

        let mut report = IngestReport::default();
        for row in rows {
            let candidate = row.map_err(|err| IngestFailure::new(report.applied, err))?;

            // Expiry drops the future but not a store call already handed to
            // the blocking pool. That write may still commit, so `applied` is
            // a lower bound on a timeout.
            let outcome =
                match timeout_at(deadline, self.reconciler.reconcile(&candidate, request_time))
                    .await
                {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(err)) => return Err(IngestFailure::new(report.applied, err)),
                    Err(_) => {
                        return Err(IngestFailure::new(
                            report.applied,
                            PriceListError::Timeout(self.store_timeout),
                        ))
                    }
                };
            report.record(&outcome);
        }

        log::info!(
            "Ingestion finished: {} applied ({} inserted, {} updated, {} unchanged)",
            report.applied,
            report.inserted,
            report.updated,
            report.unchanged
        );
        Ok(report)
    }
}
