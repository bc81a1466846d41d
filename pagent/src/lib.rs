use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::{Args, Parser, Subcommand};
use pfetcher::{FetchConfig, IngestFailure, PriceListError, PriceListIngestor};
use pstorage::{
    config::StorageConfig,
    errors::StorageError,
    models::{PageSpec, ProductRecord, SortColumn, SortDirection, SortSpec},
    query::CatalogQuery,
    store::ProductStore,
    PStorage,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_BIND: &str = "127.0.0.1:55555";
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:55555";

/// Runs the command line interface for the price catalog service.
pub async fn run_cli() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Serve(args)) => run_server(args).await?,
        Some(Command::Fetch(args)) => run_fetch_client(args).await?,
        Some(Command::List(args)) => run_list_client(args).await?,
        None => {
            println!("No subcommand provided. Use --help to see available commands.");
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Starts the price catalog HTTP service
    Serve(ServeArgs),
    /// Asks a running service to ingest a remote price list
    Fetch(FetchArgs),
    /// Prints one page of the catalog from a running service
    List(ListArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Base directory for the pstorage catalog
    #[arg(long, env = "PAGENT_BASE_PATH")]
    base_path: PathBuf,
    /// Socket address to bind the service
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: String,
    /// Directory for downloaded price lists while they are parsed
    #[arg(long, env = "PAGENT_SCRATCH_DIR", default_value = pfetcher::config::DEFAULT_SCRATCH_DIR)]
    scratch_dir: PathBuf,
    /// Budget for the store operations of one request
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,
    /// Timeout for downloading a price list
    #[arg(long, default_value_t = 30)]
    http_timeout_secs: u64,
}

#[derive(Args)]
struct FetchArgs {
    /// Base URL of a running service
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server: String,
    /// Price list URL
    #[arg(long, default_value = "http://localhost:3000/products.csv")]
    url: String,
}

#[derive(Args)]
struct ListArgs {
    /// Base URL of a running service
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server: String,
    /// Sort column: product, price, timesChanged or requestTime
    #[arg(long, default_value = "price")]
    column: SortColumn,
    /// Sort direction: ascending or descending
    #[arg(long, default_value = "ascending")]
    order: SortDirection,
    /// Page number; negative values count from the end
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    page: i64,
    /// Results per page
    #[arg(long, default_value_t = 50)]
    per_page: i64,
}

/// Explicit service configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
}

impl ServiceConfig {
    fn from_args(args: &ServeArgs) -> anyhow::Result<Self> {
        let bind: SocketAddr = args.bind.parse().context("failed to parse bind address")?;
        let storage = StorageConfig::new(&args.base_path)
            .with_request_timeout(Duration::from_secs(args.request_timeout_secs));
        let fetch = FetchConfig::new(&args.scratch_dir)
            .with_http_timeout(Duration::from_secs(args.http_timeout_secs));
        Ok(Self {
            bind,
            storage,
            fetch,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<PriceListIngestor>,
    pub query: Arc<CatalogQuery>,
    pub store: Arc<dyn ProductStore>,
}

impl AppState {
    pub fn new(
        ingestor: Arc<PriceListIngestor>,
        query: Arc<CatalogQuery>,
        store: Arc<dyn ProductStore>,
    ) -> Self {
        Self {
            ingestor,
            query,
            store,
        }
    }

    /// Wires the HTTP fetcher, reconciler and query façade over one storage.
    pub fn from_storage(storage: &PStorage, fetch: &FetchConfig) -> Result<Self, PriceListError> {
        let ingestor = PriceListIngestor::with_default_client(
            fetch,
            storage.reconciler(),
            storage.config.request_timeout,
        )?;
        Ok(Self::new(
            Arc::new(ingestor),
            Arc::new(storage.query()),
            storage.store(),
        ))
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    Ingest {
        status: StatusCode,
        message: String,
        count: u64,
    },
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn from_storage(err: StorageError) -> Self {
        match err {
            StorageError::InvalidArg(msg) => ApiError::BadRequest(msg),
            StorageError::Timeout(_) => ApiError::Timeout(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }

    fn from_ingest(failure: IngestFailure) -> Self {
        let status = match &failure.error {
            PriceListError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            PriceListError::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            err if err.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            err if err.is_fetch() => StatusCode::BAD_GATEWAY,
            PriceListError::Timeout(_) | PriceListError::Store(StorageError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::Ingest {
            status,
            message: failure.error.to_string(),
            count: failure.applied,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ingest { status, .. } => *status,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Ingest { count, .. } => json!({ "error": self.to_string(), "count": count }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(value: StorageError) -> Self {
        ApiError::from_storage(value)
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchResponse {
    pub count: u64,
}

fn default_page_number() -> i64 {
    1
}

fn default_results_per_page() -> i64 {
    50
}

fn default_order() -> SortDirection {
    SortDirection::Ascending
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    pub column: SortColumn,
    #[serde(default = "default_order")]
    pub order: SortDirection,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_results_per_page")]
    pub results_per_page: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub results: Vec<ProductRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub product_count: i64,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = ServiceConfig::from_args(&args)?;

    let storage = PStorage::new(config.storage.clone())
        .await
        .context("failed to open product catalog")?;
    let state = AppState::from_storage(&storage, &config.fetch)
        .context("failed to initialize price list fetcher")?;

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .context("failed to bind service listener")?;

    info!("Price catalog service listening on {}", config.bind);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("service error")?;

    Ok(())
}

/// Builds the HTTP router exposing the `Fetch` and `List` operations.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/fetch", post(fetch_price_list))
        .route("/api/list", get(list_products))
        .route("/api/status", get(get_status))
        .with_state(state)
}

async fn fetch_price_list(
    State(state): State<AppState>,
    payload: Result<Json<FetchRequest>, JsonRejection>,
) -> ApiResult<Json<FetchResponse>> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    info!("Received fetch request for {}", body.url);

    match state.ingestor.ingest(&body.url).await {
        Ok(report) => {
            info!(
                "Imported {} records from {} ({} unchanged)",
                report.applied, body.url, report.unchanged
            );
            Ok(Json(FetchResponse {
                count: report.applied,
            }))
        }
        Err(failure) => {
            error!("Ingestion of {} failed: {}", body.url, failure);
            Err(ApiError::from_ingest(failure))
        }
    }
}

async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    info!(
        "Received list request. Column: {}, Order: {}, PageNumber: {}, ResultsPerPage: {}",
        query.column, query.order, query.page_number, query.results_per_page
    );

    let spec = PageSpec::new(
        SortSpec::new(query.column, query.order),
        query.page_number,
        query.results_per_page,
    )?;
    let results = state.query.list(&spec).await.map_err(|err| {
        error!("List request failed: {}", err);
        ApiError::from_storage(err)
    })?;

    Ok(Json(ListResponse { results }))
}

async fn get_status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let product_count = state.store.count().await?;
    Ok(Json(StatusResponse { product_count }))
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}

async fn run_fetch_client(args: FetchArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let endpoint = format!("{}/api/fetch", args.server.trim_end_matches('/'));
    let response = client
        .post(&endpoint)
        .json(&FetchRequest { url: args.url })
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("fetch failed with HTTP {status}: {body}");
    }

    let body: FetchResponse = response.json().await.context("invalid fetch response")?;
    info!("Imported: {}", body.count);
    Ok(())
}

async fn run_list_client(args: ListArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let endpoint = format!("{}/api/list", args.server.trim_end_matches('/'));
    let query = ListQuery {
        column: args.column,
        order: args.order,
        page_number: args.page,
        results_per_page: args.per_page,
    };
    let response = client
        .get(&endpoint)
        .query(&query)
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("list failed with HTTP {status}: {body}");
    }

    let body: ListResponse = response.json().await.context("invalid list response")?;
    for record in body.results {
        let requested = chrono::DateTime::from_timestamp(record.request_time, 0)
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| record.request_time.to_string());
        info!(
            "Product: {}, Price: {}, Times price changed: {}, Request time: {}",
            record.product, record.price, record.times_changed, requested
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_timeout_maps_to_gateway_timeout_with_count() {
        let failure = IngestFailure::new(2, PriceListError::Timeout(Duration::from_millis(50)));
        let err = ApiError::from_ingest(failure);
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(matches!(err, ApiError::Ingest { count: 2, .. }));
    }

    #[test]
    fn store_timeout_inside_ingest_maps_to_gateway_timeout() {
        let failure = IngestFailure::new(
            1,
            PriceListError::Store(StorageError::Timeout(Duration::from_secs(1))),
        );
        assert_eq!(
            ApiError::from_ingest(failure).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn validation_and_media_failures_keep_distinct_statuses() {
        let invalid = IngestFailure::new(
            3,
            PriceListError::InvalidRowStructure { line: 5, fields: 3 },
        );
        assert_eq!(
            ApiError::from_ingest(invalid).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let binary = IngestFailure::new(0, PriceListError::UnsupportedType { detected: "image/png" });
        assert_eq!(
            ApiError::from_ingest(binary).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}
