pub mod http_client;

use crate::config::ApiConfig;
use crate::models::{CreatedRecord, DataSource, RecordId, StockEntry, StockRecord, TradeStatistics};
use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;
use tracing::{debug, info};

use self::http_client::{Expect, HttpClient};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure talking to the backend. `Display` is the user-facing text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// No response at all: refused, reset, DNS.
    #[error("Network Error: Cannot connect to the server. Please check if the backend server is running.")]
    Network { reason: String },

    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-success status; `message` is the body's `error` field when present.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response from server: {reason}")]
    Decode { reason: String },

    #[error("Invalid API URL: {reason}")]
    Url { reason: String },

    #[error("Failed to build HTTP client: {reason}")]
    Client { reason: String },

    #[error("Record has no id")]
    MissingId,
}

impl ApiError {
    /// True when the server was never reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::Timeout { .. })
    }
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable backend abstraction.
#[async_trait]
pub trait StockApi: Send + Sync {
    async fn fetch_records(
        &self,
        source: DataSource,
        trade_code: Option<&str>,
    ) -> Result<Vec<StockRecord>, ApiError>;
    async fn fetch_record(&self, id: &RecordId) -> Result<StockRecord, ApiError>;
    async fn fetch_trade_codes(&self) -> Result<Vec<String>, ApiError>;
    async fn fetch_statistics(&self, trade_code: &str) -> Result<TradeStatistics, ApiError>;
    /// Returns the id the backend assigned.
    async fn create(&self, entry: &StockEntry) -> Result<RecordId, ApiError>;
    /// Returns the backend's copy of the updated record.
    async fn update(&self, record: &StockRecord) -> Result<StockRecord, ApiError>;
    async fn delete(&self, id: &RecordId) -> Result<(), ApiError>;
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

pub struct HttpStockApi {
    client: HttpClient,
}

impl HttpStockApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = HttpClient::new(config)?;
        info!("Using backend {}", config.resolved_base_url());
        Ok(Self { client })
    }
}

#[async_trait]
impl StockApi for HttpStockApi {
    async fn fetch_records(
        &self,
        source: DataSource,
        trade_code: Option<&str>,
    ) -> Result<Vec<StockRecord>, ApiError> {
        let mut url = self.client.endpoint(&["api", "data"]);
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("source", source.as_str());
            if let Some(code) = trade_code {
                q.append_pair("trade_code", code);
            }
        }
        let records: Vec<StockRecord> = self.client.get_json(url, "Failed to load data").await?;
        debug!("Fetched {} records from {} source", records.len(), source);
        Ok(records)
    }

    async fn fetch_record(&self, id: &RecordId) -> Result<StockRecord, ApiError> {
        let id = id.to_string();
        let url = self.client.endpoint(&["api", "data", id.as_str()]);
        self.client.get_json(url, "Item not found").await
    }

    async fn fetch_trade_codes(&self) -> Result<Vec<String>, ApiError> {
        let url = self.client.endpoint(&["api", "trade_codes"]);
        self.client.get_json(url, "Failed to load trade codes").await
    }

    async fn fetch_statistics(&self, trade_code: &str) -> Result<TradeStatistics, ApiError> {
        let url = self.client.endpoint(&["api", "statistics", trade_code]);
        self.client
            .get_json(url, "Failed to load statistics")
            .await
    }

    async fn create(&self, entry: &StockEntry) -> Result<RecordId, ApiError> {
        let url = self.client.endpoint(&["api", "data"]);
        let created: CreatedRecord = self
            .client
            .send_json(Method::POST, url, entry, Expect::Success, "Failed to create item")
            .await?;
        Ok(created.id)
    }

    async fn update(&self, record: &StockRecord) -> Result<StockRecord, ApiError> {
        let id = record.id.as_ref().ok_or(ApiError::MissingId)?.to_string();
        let url = self.client.endpoint(&["api", "data", id.as_str()]);
        self.client
            .send_json(Method::PUT, url, record, Expect::Ok, "Failed to update item")
            .await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), ApiError> {
        let id = id.to_string();
        let url = self.client.endpoint(&["api", "data", id.as_str()]);
        self.client.delete(url, "Failed to delete item").await
    }
}
