//! CSV loader for bulk-creating records.
//!
//! Expected header: `date,trade_code,open,high,low,close,volume`. Numeric
//! cells are normalized the lenient way, so `"1,234"` volumes are fine and
//! garbage becomes 0 (and usually fails validation at create time).

use crate::models::StockEntry;
use crate::normalize::{parse_float, parse_int};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

const COLUMNS: [&str; 7] = ["date", "trade_code", "open", "high", "low", "close", "volume"];

pub fn load_entries(path: &Path) -> Result<Vec<StockEntry>> {
    debug!("Loading entries from {:?}", path);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let headers = reader.headers()?.clone();
    let index: Vec<Option<usize>> = COLUMNS
        .iter()
        .map(|c| headers.iter().position(|h| h.eq_ignore_ascii_case(c)))
        .collect();
    if index[0].is_none() || index[1].is_none() {
        anyhow::bail!("{:?}: header must contain date and trade_code", path);
    }

    let mut entries = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };
        let cell = |col: usize| index[col].and_then(|j| record.get(j)).unwrap_or("");

        let date = cell(0);
        let trade_code = cell(1);
        if date.is_empty() || trade_code.is_empty() {
            warn!("Row {} in {:?}: missing date or trade code", i + 1, path);
            continue;
        }

        entries.push(StockEntry {
            date: date.to_string(),
            trade_code: trade_code.to_uppercase(),
            open: parse_float(cell(2)),
            high: parse_float(cell(3)),
            low: parse_float(cell(4)),
            close: parse_float(cell(5)),
            volume: parse_int(cell(6)),
        });
    }

    info!("{:?}: {} entries loaded", path, entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_entries_normalizes_cells() {
        let f = write_csv(
            "date,trade_code,open,high,low,close,volume\n\
             2024-01-02,aci,10,12,9,11,\"1,500\"\n\
             2024-01-03,GP,abc,5,1,2,x\n",
        );
        let entries = load_entries(f.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].trade_code, "ACI");
        assert_eq!(entries[0].volume, 1500);
        assert_eq!(entries[1].open, 0.0);
        assert_eq!(entries[1].volume, 0);
    }

    #[test]
    fn test_columns_may_be_reordered_and_rows_skipped() {
        let f = write_csv(
            "trade_code,date,close,open,high,low,volume\n\
             ACI,2024-01-02,11,10,12,9,100\n\
             ,2024-01-03,1,1,1,1,1\n",
        );
        let entries = load_entries(f.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, "2024-01-02");
        assert_eq!(entries[0].close, 11.0);
        assert_eq!(entries[0].open, 10.0);
    }

    #[test]
    fn test_missing_key_columns_is_an_error() {
        let f = write_csv("open,high\n1,2\n");
        assert!(load_entries(f.path()).is_err());
    }
}
