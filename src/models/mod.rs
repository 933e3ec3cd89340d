use serde::{Deserialize, Serialize};
use std::fmt;

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Backend-assigned record id. The SQL source hands out integers; other
/// sources may use strings, so the value is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Text(s.to_string()),
        })
    }
}

// ── Raw numeric field ─────────────────────────────────────────────────────────

/// A numeric column exactly as the backend sent it.
/// `"1,234"`, `1234`, `12.5`, `null` and `"abc"` all occur in the wild.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    #[default]
    Null,
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

// ── Stock record ──────────────────────────────────────────────────────────────

/// One trading-day observation for one trade code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub date: String,
    pub trade_code: String,
    #[serde(default)]
    pub open: FieldValue,
    #[serde(default)]
    pub high: FieldValue,
    #[serde(default)]
    pub low: FieldValue,
    #[serde(default)]
    pub close: FieldValue,
    #[serde(default)]
    pub volume: FieldValue,
}

impl StockRecord {
    /// Build a record from a typed entry, as the backend echoes it after create.
    pub fn from_entry(id: Option<RecordId>, entry: &StockEntry) -> Self {
        Self {
            id,
            date: entry.date.clone(),
            trade_code: entry.trade_code.clone(),
            open: FieldValue::Float(entry.open),
            high: FieldValue::Float(entry.high),
            low: FieldValue::Float(entry.low),
            close: FieldValue::Float(entry.close),
            volume: FieldValue::Int(entry.volume),
        }
    }
}

/// Normalized, typed OHLCV row used for create and inline edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub date: String,
    pub trade_code: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Response body of `POST /api/data`: the echoed entry plus its new id.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRecord {
    pub id: RecordId,
}

// ── Data source ───────────────────────────────────────────────────────────────

/// Which backend persistence the list endpoint reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Json,
    Sql,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Json => "json",
            DataSource::Sql => "sql",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DataSource::Json => DataSource::Sql,
            DataSource::Sql => DataSource::Json,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Backend statistics ────────────────────────────────────────────────────────

/// `GET /api/statistics/{trade_code}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub count: u64,
    pub avg_close: f64,
    pub max_close: f64,
    pub min_close: f64,
    pub avg_volume: f64,
    pub max_volume: i64,
    pub min_volume: i64,
    /// Sample standard deviation of close; null for a single row.
    pub volatility: Option<f64>,
}
