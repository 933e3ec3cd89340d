//! The single owner of dashboard state.
//!
//! Views read from the [`RecordStore`]; every write goes through the
//! [`MutationGateway`] and comes back here as a notification.

use crate::api::StockApi;
use crate::chart::{self, ChartKind, ChartPoint, ChartSummary, DateRange};
use crate::config::AppConfig;
use crate::gateway::{MutationError, MutationGateway};
use crate::models::{DataSource, RecordId, StockEntry, StockRecord};
use crate::store::RecordStore;
use crate::table::{DeleteRequest, TableView};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

pub const LOAD_FAILED: &str = "Failed to load data. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Blocks the main view.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Open delete dialog. A failed attempt keeps it open with `error` set so the
/// user can retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub id: RecordId,
    pub deleting: bool,
    pub error: Option<String>,
}

pub struct Dashboard<A> {
    gateway: MutationGateway<A>,
    store: RecordStore,
    trade_codes: Vec<String>,
    source: DataSource,
    load: LoadState,
    notification: Option<Notification>,
    pub table: TableView,
    pub date_range: DateRange,
    pub chart_kind: ChartKind,
    pending_delete: Option<DeleteConfirmation>,
}

impl<A: StockApi> Dashboard<A> {
    pub fn new(api: A, config: &AppConfig) -> Self {
        Self {
            gateway: MutationGateway::new(api),
            store: RecordStore::new(),
            trade_codes: Vec::new(),
            source: config.api.data_source,
            load: LoadState::Loading,
            notification: None,
            table: TableView::new(config.table.page_size),
            date_range: config.chart.date_range,
            chart_kind: config.chart.kind,
            pending_delete: None,
        }
    }

    pub fn api(&self) -> &A {
        self.gateway.api()
    }

    // ── loading ───────────────────────────────────────────────────────────────

    /// Fetch the dataset and the trade-code list. A dataset failure puts the
    /// dashboard in [`LoadState::Failed`]; a code-list failure only leaves
    /// the selector empty.
    pub async fn refresh(&mut self) {
        self.load = LoadState::Loading;
        let fetched = self.api().fetch_records(self.source, None).await;
        match fetched {
            Ok(records) => {
                info!("Loaded {} records ({} source)", records.len(), self.source);
                self.store.load(records);
                self.load = LoadState::Ready;
            }
            Err(e) => {
                warn!("Error fetching data: {}", e);
                self.load = LoadState::Failed(LOAD_FAILED.to_string());
            }
        }

        let codes = self.api().fetch_trade_codes().await;
        match codes {
            Ok(codes) => {
                debug!("{} trade codes", codes.len());
                if self.store.selected().is_none() {
                    if let Some(first) = codes.first() {
                        self.store.set_filter(first);
                    }
                }
                self.trade_codes = codes;
            }
            Err(e) => warn!("Error fetching trade codes: {}", e),
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn trade_codes(&self) -> &[String] {
        &self.trade_codes
    }

    pub fn data_source(&self) -> DataSource {
        self.source
    }

    /// Switch json ↔ sql. The caller refreshes afterwards.
    pub fn toggle_data_source(&mut self) -> DataSource {
        self.source = self.source.toggled();
        self.source
    }

    pub fn set_data_source(&mut self, source: DataSource) {
        self.source = source;
    }

    pub fn select_trade_code(&mut self, code: &str) {
        self.store.set_filter(code);
    }

    pub fn selected_trade_code(&self) -> Option<&str> {
        self.store.selected()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn filtered(&self) -> Vec<&StockRecord> {
        self.store.filtered()
    }

    // ── derived views ─────────────────────────────────────────────────────────

    pub fn table_rows(&self) -> Vec<&StockRecord> {
        self.table.rows(&self.store.filtered())
    }

    pub fn table_pages(&self) -> usize {
        self.table.total_pages(&self.store.filtered())
    }

    pub fn chart_points(&self, today: NaiveDate) -> Vec<ChartPoint> {
        chart::derive_points(&self.store.filtered(), self.date_range, today)
    }

    pub fn chart_summary(&self) -> ChartSummary {
        chart::summarize(&self.store.filtered())
    }

    // ── notifications ─────────────────────────────────────────────────────────

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    // ── create ────────────────────────────────────────────────────────────────

    pub async fn create(&mut self, entry: &StockEntry) -> Result<StockRecord, MutationError> {
        let result = self.gateway.create(&mut self.store, entry).await;
        match &result {
            Ok(_) => {
                self.notification = Some(Notification::success("Item created successfully"))
            }
            Err(MutationError::Validation(e)) => {
                self.notification = Some(Notification::error(e.to_string()))
            }
            Err(e) => {
                warn!("Error creating item: {}", e);
                self.notification = Some(Notification::error(
                    "Failed to create item. Please try again.",
                ))
            }
        }
        result
    }

    // ── inline edit ───────────────────────────────────────────────────────────

    pub fn begin_edit(&mut self, id: &RecordId) -> bool {
        match self.store.get(id) {
            Some(record) => self.table.begin_edit(record),
            None => false,
        }
    }

    /// Save the open edit session. `false` leaves the session open for a retry
    /// or cancel.
    pub async fn save_edit(&mut self) -> bool {
        let record = match self.table.begin_save() {
            Ok(r) => r,
            Err(e) => {
                self.notification = Some(Notification::error(e.to_string()));
                return false;
            }
        };

        let success = match self.gateway.update(&mut self.store, &record).await {
            Ok(_) => {
                self.notification = Some(Notification::success("Item updated successfully"));
                true
            }
            Err(e) => {
                self.notification = Some(Notification::error(e.to_string()));
                false
            }
        };
        self.table.finish_save(success);
        success
    }

    // ── delete ────────────────────────────────────────────────────────────────

    pub fn request_delete(&mut self, request: DeleteRequest) {
        self.pending_delete = Some(DeleteConfirmation {
            id: request.id,
            deleting: false,
            error: None,
        });
    }

    pub fn pending_delete(&self) -> Option<&DeleteConfirmation> {
        self.pending_delete.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Run the pending delete. Returns `true` when the dialog closed.
    pub async fn confirm_delete(&mut self) -> bool {
        let Some(pending) = self.pending_delete.as_mut() else {
            return false;
        };
        pending.deleting = true;
        pending.error = None;
        let id = pending.id.clone();

        let result = self.gateway.delete(&mut self.store, &id).await;
        match result {
            Ok(()) => {
                self.pending_delete = None;
                self.notification = Some(Notification::success("Item deleted successfully"));
                true
            }
            Err(e) => {
                warn!("Error deleting item: {}", e);
                if let Some(pending) = self.pending_delete.as_mut() {
                    pending.deleting = false;
                    pending.error = Some(e.delete_message());
                }
                false
            }
        }
    }
}
