//! In-memory record collection plus the selected trade-code filter.

use crate::models::{RecordId, StockRecord};

#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<StockRecord>,
    selected: Option<String>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held collection wholesale.
    pub fn load(&mut self, records: Vec<StockRecord>) {
        self.records = records;
    }

    /// An empty code clears the filter.
    pub fn set_filter(&mut self, trade_code: &str) {
        let code = trade_code.trim();
        self.selected = if code.is_empty() {
            None
        } else {
            Some(code.to_string())
        };
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Records matching the filter, in original order.
    pub fn filtered(&self) -> Vec<&StockRecord> {
        match &self.selected {
            None => self.records.iter().collect(),
            Some(code) => self
                .records
                .iter()
                .filter(|r| &r.trade_code == code)
                .collect(),
        }
    }

    pub fn records(&self) -> &[StockRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &RecordId) -> Option<&StockRecord> {
        self.position(id).map(|i| &self.records[i])
    }

    /// Replace the record with the same id in place. Unknown ids are ignored.
    pub fn apply_update(&mut self, record: StockRecord) -> bool {
        let Some(id) = record.id.as_ref() else {
            return false;
        };
        match self.position(id) {
            Some(i) => {
                self.records[i] = record;
                true
            }
            None => false,
        }
    }

    pub fn apply_delete(&mut self, id: &RecordId) -> bool {
        match self.position(id) {
            Some(i) => {
                self.records.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn apply_create(&mut self, record: StockRecord) {
        self.records.push(record);
    }

    /// Distinct trade codes in first-seen order.
    pub fn trade_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for r in &self.records {
            if !codes.iter().any(|c| c == &r.trade_code) {
                codes.push(r.trade_code.clone());
            }
        }
        codes
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id.as_ref() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn rec(id: i64, code: &str) -> StockRecord {
        StockRecord {
            id: Some(RecordId::Int(id)),
            date: format!("2020-01-{:02}", id),
            trade_code: code.to_string(),
            open: FieldValue::Float(1.0),
            high: FieldValue::Float(2.0),
            low: FieldValue::Float(0.5),
            close: FieldValue::Float(1.5),
            volume: FieldValue::Int(100),
        }
    }

    fn store() -> RecordStore {
        let mut s = RecordStore::new();
        s.load(vec![rec(1, "ACI"), rec(2, "GP"), rec(3, "ACI"), rec(4, "BATBC")]);
        s
    }

    fn ids(v: &[&StockRecord]) -> Vec<RecordId> {
        v.iter().filter_map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        let s = store();
        assert_eq!(
            ids(&s.filtered()),
            vec![
                RecordId::Int(1),
                RecordId::Int(2),
                RecordId::Int(3),
                RecordId::Int(4)
            ]
        );
    }

    #[test]
    fn test_filter_keeps_only_matching_in_order() {
        let mut s = store();
        s.set_filter("ACI");
        assert_eq!(ids(&s.filtered()), vec![RecordId::Int(1), RecordId::Int(3)]);
        s.set_filter("");
        assert_eq!(s.selected(), None);
        assert_eq!(s.filtered().len(), 4);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut s = store();
        let mut changed = rec(2, "GP");
        changed.close = FieldValue::Float(9.0);
        assert!(s.apply_update(changed));
        assert_eq!(s.records()[1].close, FieldValue::Float(9.0));
        assert!(!s.apply_update(rec(99, "X")));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_delete_and_create() {
        let mut s = store();
        assert!(s.apply_delete(&RecordId::Int(3)));
        assert!(!s.apply_delete(&RecordId::Int(3)));
        s.apply_create(rec(5, "GP"));
        assert_eq!(
            ids(&s.filtered()),
            vec![
                RecordId::Int(1),
                RecordId::Int(2),
                RecordId::Int(4),
                RecordId::Int(5)
            ]
        );
    }

    #[test]
    fn test_trade_codes_first_seen() {
        assert_eq!(store().trade_codes(), vec!["ACI", "GP", "BATBC"]);
    }
}
