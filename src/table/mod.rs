//! Table view: search → sort → paginate, plus the inline edit session.

use crate::models::{RecordId, StockRecord};
use crate::normalize::{parse_float, parse_int, to_float, to_int, try_float, try_int};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

// ── Sorting ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Date,
    TradeCode,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl SortKey {
    fn is_numeric(self) -> bool {
        !matches!(self, SortKey::Date | SortKey::TradeCode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    /// Clicking the active ascending column flips it; anything else sorts ascending.
    pub fn request(&mut self, key: SortKey) {
        self.direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.key = key;
    }

    fn compare(&self, a: &StockRecord, b: &StockRecord) -> Ordering {
        let ord = match self.key {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::TradeCode => a.trade_code.cmp(&b.trade_code),
            key => {
                debug_assert!(key.is_numeric());
                // Unparsable values rank below every number: first when
                // ascending, last once the order is reversed.
                match (numeric_field(a, key), numeric_field(b, key)) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                }
            }
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

fn numeric_field(r: &StockRecord, key: SortKey) -> Option<f64> {
    let v = match key {
        SortKey::Open => &r.open,
        SortKey::High => &r.high,
        SortKey::Low => &r.low,
        SortKey::Close => &r.close,
        // Volumes arrive comma-grouped from the json source.
        SortKey::Volume => return try_int(&r.volume).map(|n| n as f64),
        SortKey::Date | SortKey::TradeCode => return None,
    };
    try_float(v)
}

/// Stable: ties keep their input order.
pub fn sort_records<'a>(records: &mut [&'a StockRecord], config: &SortConfig) {
    records.sort_by(|a, b| config.compare(a, b));
}

/// Case-insensitive substring match on trade code or date.
pub fn search_records<'a>(records: &[&'a StockRecord], term: &str) -> Vec<&'a StockRecord> {
    let needle = term.to_lowercase();
    records
        .iter()
        .copied()
        .filter(|r| {
            needle.is_empty()
                || r.trade_code.to_lowercase().contains(&needle)
                || r.date.to_lowercase().contains(&needle)
        })
        .collect()
}

// ── Pagination ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    Five,
    #[default]
    Ten,
    TwentyFive,
    Fifty,
}

impl PageSize {
    pub fn get(self) -> usize {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = String;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        match n {
            5 => Ok(PageSize::Five),
            10 => Ok(PageSize::Ten),
            25 => Ok(PageSize::TwentyFive),
            50 => Ok(PageSize::Fifty),
            other => Err(format!("page size must be one of 5, 10, 25, 50 (got {})", other)),
        }
    }
}

impl From<PageSize> for usize {
    fn from(p: PageSize) -> usize {
        p.get()
    }
}

/// 1-based page slice. Pages past the end are empty, not an error.
pub fn paginate<T: Copy>(items: &[T], page: usize, size: PageSize) -> Vec<T> {
    let size = size.get();
    let start = page.saturating_sub(1).saturating_mul(size);
    items.iter().skip(start).take(size).copied().collect()
}

pub fn total_pages(count: usize, size: PageSize) -> usize {
    count.div_ceil(size.get())
}

// ── Inline edit ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("High price must be greater than or equal to Open price")]
    HighBelowOpen,
    #[error("Open price must be greater than or equal to Low price")]
    OpenBelowLow,
    #[error("High price must be greater than Low price")]
    HighBelowLow,
    /// Edit-time wording of the high/low check.
    #[error("High price cannot be less than low price")]
    EditHighBelowLow,
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Nothing is being edited")]
    NoEditInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// Working copy of one row, decoupled from the store until saved.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    pub id: RecordId,
    pub date: String,
    pub trade_code: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl EditBuffer {
    fn snapshot(id: RecordId, r: &StockRecord) -> Self {
        Self {
            id,
            date: r.date.clone(),
            trade_code: r.trade_code.clone(),
            open: to_float(&r.open),
            high: to_float(&r.high),
            low: to_float(&r.low),
            close: to_float(&r.close),
            volume: to_int(&r.volume),
        }
    }

    pub fn to_record(&self) -> StockRecord {
        StockRecord {
            id: Some(self.id.clone()),
            date: self.date.clone(),
            trade_code: self.trade_code.clone(),
            open: self.open.into(),
            high: self.high.into(),
            low: self.low.into(),
            close: self.close.into(),
            volume: self.volume.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub buffer: EditBuffer,
    pub saving: bool,
}

/// Returned by the table when the user asks to delete a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub id: RecordId,
}

// ── Table state ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TableView {
    search: String,
    sort: SortConfig,
    page_size: PageSize,
    page: usize,
    edit: Option<EditSession>,
}

impl TableView {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            page: 1,
            ..Self::default()
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn request_sort(&mut self, key: SortKey) {
        self.sort.request(key);
    }

    pub fn set_sort(&mut self, sort: SortConfig) {
        self.sort = sort;
    }

    pub fn sort(&self) -> SortConfig {
        self.sort
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        self.page_size = size;
        self.page = 1;
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Searched and sorted, before pagination.
    pub fn arranged<'a>(&self, records: &[&'a StockRecord]) -> Vec<&'a StockRecord> {
        let mut rows = search_records(records, &self.search);
        sort_records(&mut rows, &self.sort);
        rows
    }

    /// The rows visible on the current page.
    pub fn rows<'a>(&self, records: &[&'a StockRecord]) -> Vec<&'a StockRecord> {
        paginate(&self.arranged(records), self.page, self.page_size)
    }

    pub fn total_pages(&self, records: &[&StockRecord]) -> usize {
        total_pages(self.arranged(records).len(), self.page_size)
    }

    // ── edit session ──────────────────────────────────────────────────────────

    /// Rows without an id cannot be written back, so they are not editable.
    pub fn begin_edit(&mut self, record: &StockRecord) -> bool {
        let Some(id) = record.id.clone() else {
            return false;
        };
        self.edit = Some(EditSession {
            buffer: EditBuffer::snapshot(id, record),
            saving: false,
        });
        true
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn is_editing(&self, id: &RecordId) -> bool {
        self.edit.as_ref().is_some_and(|e| &e.buffer.id == id)
    }

    /// Apply text typed into one numeric cell. Bad input becomes 0.
    pub fn edit_field(&mut self, field: EditField, text: &str) {
        let Some(session) = self.edit.as_mut() else {
            return;
        };
        let b = &mut session.buffer;
        match field {
            EditField::Open => b.open = parse_float(text),
            EditField::High => b.high = parse_float(text),
            EditField::Low => b.low = parse_float(text),
            EditField::Close => b.close = parse_float(text),
            EditField::Volume => b.volume = parse_int(text),
        }
    }

    /// Validate and mark the session as saving. On error the session stays
    /// open and untouched.
    pub fn begin_save(&mut self) -> Result<StockRecord, ValidationError> {
        let session = self.edit.as_mut().ok_or(ValidationError::NoEditInProgress)?;
        if session.buffer.high < session.buffer.low {
            return Err(ValidationError::EditHighBelowLow);
        }
        session.saving = true;
        Ok(session.buffer.to_record())
    }

    /// Close out a save. The spinner always stops; the session only closes
    /// when the write succeeded.
    pub fn finish_save(&mut self, success: bool) {
        if success {
            self.edit = None;
        } else if let Some(session) = self.edit.as_mut() {
            session.saving = false;
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    pub fn request_delete(&self, id: RecordId) -> DeleteRequest {
        DeleteRequest { id }
    }
}
