//! Write-through mutations: one backend round-trip, then reconcile the local
//! store only if the round-trip succeeded.

use crate::api::{ApiError, StockApi};
use crate::models::{RecordId, StockEntry, StockRecord};
use crate::store::RecordStore;
use crate::table::ValidationError;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Item not found in the current dataset")]
    NotFoundLocally { id: RecordId },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl MutationError {
    /// Message for the delete dialog, which uses a shorter network wording.
    pub fn delete_message(&self) -> String {
        match self {
            MutationError::Api(e) if e.is_unreachable() => {
                "Network Error: Cannot connect to the server".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Create-time checks, first failure wins. `close` is not range-checked.
pub fn validate_entry(entry: &StockEntry) -> Result<(), ValidationError> {
    if entry.date.trim().is_empty() {
        return Err(ValidationError::Missing("Date"));
    }
    if entry.trade_code.trim().is_empty() {
        return Err(ValidationError::Missing("Trade code"));
    }
    if entry.high < entry.open {
        return Err(ValidationError::HighBelowOpen);
    }
    if entry.open < entry.low {
        return Err(ValidationError::OpenBelowLow);
    }
    if entry.high < entry.low {
        return Err(ValidationError::HighBelowLow);
    }
    Ok(())
}

pub struct MutationGateway<A> {
    api: A,
}

impl<A: StockApi> MutationGateway<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Validate locally, POST, then append `{id, ..entry}`.
    pub async fn create(
        &self,
        store: &mut RecordStore,
        entry: &StockEntry,
    ) -> Result<StockRecord, MutationError> {
        validate_entry(entry)?;
        let id = self.api.create(entry).await?;
        let record = StockRecord::from_entry(Some(id), entry);
        store.apply_create(record.clone());
        info!("Created {} {} as id {}", entry.trade_code, entry.date, record_id(&record));
        Ok(record)
    }

    /// PUT, then overwrite the local copy with the server's. On failure the
    /// store is untouched.
    pub async fn update(
        &self,
        store: &mut RecordStore,
        record: &StockRecord,
    ) -> Result<StockRecord, MutationError> {
        let mut saved = self.api.update(record).await.map_err(|e| {
            warn!("Update of {} failed: {}", record_id(record), e);
            e
        })?;
        // Some backends echo without the id.
        if saved.id.is_none() {
            saved.id = record.id.clone();
        }
        store.apply_update(saved.clone());
        info!("Updated id {}", record_id(&saved));
        Ok(saved)
    }

    /// Refuses ids the store never held, so no DELETE goes out for them.
    pub async fn delete(&self, store: &mut RecordStore, id: &RecordId) -> Result<(), MutationError> {
        if !store.contains(id) {
            return Err(MutationError::NotFoundLocally { id: id.clone() });
        }
        self.api.delete(id).await.map_err(|e| {
            warn!("Delete of {} failed: {}", id, e);
            e
        })?;
        store.apply_delete(id);
        info!("Deleted id {}", id);
        Ok(())
    }
}

fn record_id(r: &StockRecord) -> String {
    r.id.as_ref().map(|i| i.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory backend that records every call it receives.

    use super::*;
    use crate::models::{DataSource, TradeStatistics};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeApi {
        pub records: Vec<StockRecord>,
        pub trade_codes: Option<Vec<String>>,
        pub fail_fetch: Option<ApiError>,
        pub fail_mutations: Option<ApiError>,
        pub next_id: i64,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn mutation(&self) -> Result<(), ApiError> {
            match &self.fail_mutations {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl StockApi for FakeApi {
        async fn fetch_records(
            &self,
            source: DataSource,
            _trade_code: Option<&str>,
        ) -> Result<Vec<StockRecord>, ApiError> {
            self.log(format!("GET data {}", source));
            match &self.fail_fetch {
                Some(e) => Err(e.clone()),
                None => Ok(self.records.clone()),
            }
        }

        async fn fetch_record(&self, id: &RecordId) -> Result<StockRecord, ApiError> {
            self.log(format!("GET data/{}", id));
            self.records
                .iter()
                .find(|r| r.id.as_ref() == Some(id))
                .cloned()
                .ok_or(ApiError::Server {
                    status: 404,
                    message: "Item not found".into(),
                })
        }

        async fn fetch_trade_codes(&self) -> Result<Vec<String>, ApiError> {
            self.log("GET trade_codes".into());
            self.trade_codes.clone().ok_or(ApiError::Network {
                reason: "refused".into(),
            })
        }

        async fn fetch_statistics(&self, trade_code: &str) -> Result<TradeStatistics, ApiError> {
            self.log(format!("GET statistics/{}", trade_code));
            Err(ApiError::Server {
                status: 404,
                message: format!("No data found for trade code {}", trade_code),
            })
        }

        async fn create(&self, entry: &StockEntry) -> Result<RecordId, ApiError> {
            self.log(format!("POST {}", entry.trade_code));
            self.mutation()?;
            Ok(RecordId::Int(self.next_id))
        }

        async fn update(&self, record: &StockRecord) -> Result<StockRecord, ApiError> {
            self.log(format!("PUT {}", record_id(record)));
            self.mutation()?;
            Ok(record.clone())
        }

        async fn delete(&self, id: &RecordId) -> Result<(), ApiError> {
            self.log(format!("DELETE {}", id));
            self.mutation()
        }
    }

    pub fn record(id: i64, code: &str) -> StockRecord {
        StockRecord {
            id: Some(RecordId::Int(id)),
            date: format!("2024-01-{:02}", id),
            trade_code: code.to_string(),
            open: 10.0.into(),
            high: 12.0.into(),
            low: 9.0.into(),
            close: 11.0.into(),
            volume: 1000i64.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{record, FakeApi};
    use super::*;
    use crate::models::FieldValue;

    fn entry(open: f64, high: f64, low: f64) -> StockEntry {
        StockEntry {
            date: "2024-02-01".into(),
            trade_code: "ACI".into(),
            open,
            high,
            low,
            close: 100.0,
            volume: 10,
        }
    }

    fn seeded() -> RecordStore {
        let mut store = RecordStore::new();
        store.load(vec![record(1, "ACI"), record(2, "GP")]);
        store
    }

    #[tokio::test]
    async fn test_create_rejects_high_below_open_without_network() {
        let gw = MutationGateway::new(FakeApi::default());
        let mut store = seeded();
        let err = gw.create(&mut store, &entry(10.0, 5.0, 1.0)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "High price must be greater than or equal to Open price"
        );
        assert!(gw.api().calls().is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_validation_order_and_close_is_unchecked() {
        assert_eq!(
            validate_entry(&entry(1.0, 5.0, 2.0)),
            Err(ValidationError::OpenBelowLow)
        );
        // close = 100 is outside [low, high] and still accepted.
        assert_eq!(validate_entry(&entry(3.0, 5.0, 1.0)), Ok(()));
        let mut e = entry(3.0, 5.0, 1.0);
        e.trade_code = " ".into();
        assert_eq!(validate_entry(&e), Err(ValidationError::Missing("Trade code")));
    }

    #[tokio::test]
    async fn test_create_appends_with_returned_id() {
        let gw = MutationGateway::new(FakeApi {
            next_id: 42,
            ..FakeApi::default()
        });
        let mut store = seeded();
        let rec = gw.create(&mut store, &entry(3.0, 5.0, 1.0)).await.unwrap();
        assert_eq!(rec.id, Some(RecordId::Int(42)));
        assert_eq!(store.records().last(), Some(&rec));
        assert_eq!(rec.close, FieldValue::Float(100.0));
    }

    #[tokio::test]
    async fn test_update_failure_leaves_store_untouched() {
        let gw = MutationGateway::new(FakeApi {
            fail_mutations: Some(ApiError::Server {
                status: 409,
                message: "stale version".into(),
            }),
            ..FakeApi::default()
        });
        let mut store = seeded();
        let mut changed = record(1, "ACI");
        changed.close = 99.0.into();
        let err = gw.update(&mut store, &changed).await.unwrap_err();
        assert_eq!(err.to_string(), "stale version");
        assert_eq!(store.records()[0], record(1, "ACI"));
    }

    #[tokio::test]
    async fn test_update_success_overwrites() {
        let gw = MutationGateway::new(FakeApi::default());
        let mut store = seeded();
        let mut changed = record(2, "GP");
        changed.volume = 5i64.into();
        gw.update(&mut store, &changed).await.unwrap();
        assert_eq!(store.records()[1].volume, FieldValue::Int(5));
        assert_eq!(gw.api().calls(), vec!["PUT 2"]);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_never_hits_network() {
        let gw = MutationGateway::new(FakeApi::default());
        let mut store = seeded();
        let err = gw.delete(&mut store, &RecordId::Int(99)).await.unwrap_err();
        assert_eq!(err.to_string(), "Item not found in the current dataset");
        assert!(gw.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_record_and_words_network_errors() {
        let gw = MutationGateway::new(FakeApi {
            fail_mutations: Some(ApiError::Network {
                reason: "refused".into(),
            }),
            ..FakeApi::default()
        });
        let mut store = seeded();
        let err = gw.delete(&mut store, &RecordId::Int(1)).await.unwrap_err();
        assert_eq!(
            err.delete_message(),
            "Network Error: Cannot connect to the server"
        );
        assert!(store.contains(&RecordId::Int(1)));
    }

    #[tokio::test]
    async fn test_delete_timeout_uses_unreachable_wording() {
        let gw = MutationGateway::new(FakeApi {
            fail_mutations: Some(ApiError::Timeout { secs: 30 }),
            ..FakeApi::default()
        });
        let mut store = seeded();
        let err = gw.delete(&mut store, &RecordId::Int(2)).await.unwrap_err();
        assert_eq!(
            err.delete_message(),
            "Network Error: Cannot connect to the server"
        );
        assert!(store.contains(&RecordId::Int(2)));

        let server = MutationError::Api(ApiError::Server {
            status: 500,
            message: "Failed to delete item".into(),
        });
        assert_eq!(server.delete_message(), "Failed to delete item");
    }

    #[tokio::test]
    async fn test_delete_success_removes_locally() {
        let gw = MutationGateway::new(FakeApi::default());
        let mut store = seeded();
        gw.delete(&mut store, &RecordId::Int(1)).await.unwrap();
        assert!(!store.contains(&RecordId::Int(1)));
        assert_eq!(gw.api().calls(), vec!["DELETE 1"]);
    }
}
