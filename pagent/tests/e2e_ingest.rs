//! End-to-end ingestion test.
//!
//! Spins up a local server publishing price lists plus the real service on
//! ephemeral ports, then drives the public HTTP API with reqwest:
//!   1. ingest a fresh price list and re-ingest it unchanged,
//!   2. list the catalog back in reverse product order,
//!   3. check validation and media-type failures keep their partial counts.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use pagent::{build_router, AppState, FetchResponse, ListResponse};
use pfetcher::FetchConfig;
use pstorage::{config::StorageConfig, PStorage};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::{net::TcpListener, sync::oneshot};

const PRODUCTS: &str = "PRODUCT NAME;PRICE\n\
    mango;2.5\n\
    apple;1.1\n\
    orange;0.8\n\
    banana;0.3\n\
    cherry;6\n";

const BROKEN: &str = "PRODUCT NAME;PRICE\n\
    papaya;3\n\
    lime;0.4;0.5\n\
    plum;1\n";

struct Spawned {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Spawned {
    async fn serve(app: Router) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr().context("missing local addr")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                tracing::error!("test server error: {err:?}");
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Spawned {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

struct TestEnv {
    prices: Spawned,
    service: Spawned,
    scratch_dir: PathBuf,
    client: reqwest::Client,
    _tmp_dir: TempDir,
}

impl TestEnv {
    async fn start() -> Result<Self> {
        let prices = Spawned::serve(
            Router::new()
                .route("/products.csv", get(|| async { PRODUCTS }))
                .route("/broken.csv", get(|| async { BROKEN }))
                .route("/golang.png", get(|| async { &b"\x89PNG\r\n\x1a\nfake"[..] })),
        )
        .await?;

        let tmp_dir = tempfile::tempdir().context("failed to create tempdir")?;
        let storage = PStorage::new(StorageConfig::new(tmp_dir.path().join("store")))
            .await
            .context("failed to init pstorage")?;
        let scratch_dir = tmp_dir.path().join("tmp");
        let state = AppState::from_storage(&storage, &FetchConfig::new(&scratch_dir))
            .context("failed to build app state")?;
        let service = Spawned::serve(build_router(state)).await?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            prices,
            service,
            scratch_dir,
            client,
            _tmp_dir: tmp_dir,
        })
    }

    async fn fetch(&self, path: &str) -> Result<(reqwest::StatusCode, Value)> {
        let response = self
            .client
            .post(self.service.url("/api/fetch"))
            .json(&json!({ "url": self.prices.url(path) }))
            .send()
            .await
            .context("failed to invoke fetch endpoint")?;
        let status = response.status();
        let body = response.json::<Value>().await?;
        Ok((status, body))
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch_dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ingest_reingest_and_list() -> Result<()> {
    let env = TestEnv::start().await?;

    let (status, body) = env.fetch("/products.csv").await?;
    assert!(status.is_success(), "fetch returned {status}: {body}");
    let first: FetchResponse = serde_json::from_value(body)?;
    assert_eq!(first.count, 5);

    let (status, body) = env.fetch("/products.csv").await?;
    assert!(status.is_success(), "fetch returned {status}: {body}");
    let second: FetchResponse = serde_json::from_value(body)?;
    assert_eq!(second.count, 0);

    let listed: ListResponse = env
        .client
        .get(env.service.url("/api/list"))
        .query(&[
            ("column", "product"),
            ("order", "descending"),
            ("page_number", "1"),
            ("results_per_page", "10"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let names: Vec<_> = listed.results.iter().map(|r| r.product.as_str()).collect();
    assert_eq!(names, vec!["orange", "mango", "cherry", "banana", "apple"]);
    assert!(listed.results.iter().all(|r| r.times_changed == 0));

    assert!(env.scratch_is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn broken_row_reports_partial_count() -> Result<()> {
    let env = TestEnv::start().await?;

    let (status, body) = env.fetch("/broken.csv").await?;
    assert_eq!(status, reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["count"].as_u64(), Some(1));
    assert!(body["error"]
        .as_str()
        .is_some_and(|msg| msg.contains("Incorrect CSV file structure")));

    assert!(env.scratch_is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn binary_download_is_rejected() -> Result<()> {
    let env = TestEnv::start().await?;

    let (status, body) = env.fetch("/golang.png").await?;
    assert_eq!(status, reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["count"].as_u64(), Some(0));
    assert!(env.scratch_is_empty());
    Ok(())
}
