//! Chart series derivation: date ordering, range cutoff, moving averages
//! and the summary cards shown above the charts.

use crate::models::{RecordId, StockRecord};
use crate::normalize::{to_float, to_int};
use crate::utils::{fmt_number, fmt_price};
use chrono::{Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `M/D/YYYY`, the en-US short date.
const POINT_DATE_FORMAT: &str = "%-m/%-d/%Y";

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum DateRange {
    #[default]
    #[serde(rename = "all")]
    #[value(name = "all")]
    All,
    #[serde(rename = "1m")]
    #[value(name = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    #[value(name = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    #[value(name = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    #[value(name = "1y")]
    OneYear,
}

impl DateRange {
    /// Inclusive lower bound relative to `today`; `None` for `All`.
    pub fn cutoff(self, today: NaiveDate) -> Option<NaiveDate> {
        let months = match self {
            DateRange::All => return None,
            DateRange::OneMonth => 1,
            DateRange::ThreeMonths => 3,
            DateRange::SixMonths => 6,
            DateRange::OneYear => 12,
        };
        today.checked_sub_months(Months::new(months))
    }
}

/// Visual projection over the same point series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Volume,
    #[default]
    Combined,
    Band,
}

impl ChartKind {
    /// Point columns this projection plots.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ChartKind::Line => &["close", "ma5", "ma20"],
            ChartKind::Volume => &["volume"],
            ChartKind::Combined => &["close", "volume"],
            ChartKind::Band => &["high", "low", "open", "close"],
        }
    }
}

// ── Points ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma20: Option<f64>,
}

impl ChartPoint {
    /// Value of a named column, as listed by [`ChartKind::columns`].
    pub fn column(&self, name: &str) -> Option<f64> {
        match name {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "volume" => Some(self.volume as f64),
            "ma5" => self.ma5,
            "ma20" => self.ma20,
            _ => None,
        }
    }
}

/// Accepts `YYYY-MM-DD` and full ISO timestamps.
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Trailing simple moving average. The first `window - 1` slots are `None`.
pub fn moving_average(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }
    let mut out = Vec::with_capacity(closes.len());
    let mut sum = 0.0;
    for (i, c) in closes.iter().enumerate() {
        sum += c;
        if i >= window {
            sum -= closes[i - window];
        }
        out.push(if i + 1 >= window {
            Some(sum / window as f64)
        } else {
            None
        });
    }
    out
}

/// Sort by date, cut to `range` relative to `today`, map to points and attach
/// MA5 / MA20 where there are enough points for them.
pub fn derive_points(records: &[&StockRecord], range: DateRange, today: NaiveDate) -> Vec<ChartPoint> {
    let mut dated: Vec<(Option<NaiveDate>, &StockRecord)> = records
        .iter()
        .map(|r| (parse_record_date(&r.date), *r))
        .collect();
    // Unparsable dates sort first (None < Some); stable within a day.
    dated.sort_by_key(|(d, _)| *d);

    if let Some(start) = range.cutoff(today) {
        dated.retain(|(d, _)| d.is_some_and(|d| d >= start));
    }

    let mut points: Vec<ChartPoint> = dated
        .into_iter()
        .map(|(d, r)| ChartPoint {
            date: d
                .map(|d| d.format(POINT_DATE_FORMAT).to_string())
                .unwrap_or_else(|| r.date.clone()),
            open: to_float(&r.open),
            high: to_float(&r.high),
            low: to_float(&r.low),
            close: to_float(&r.close),
            volume: to_int(&r.volume),
            id: r.id.clone(),
            ma5: None,
            ma20: None,
        })
        .collect();

    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    if closes.len() >= 5 {
        for (p, ma) in points.iter_mut().zip(moving_average(&closes, 5)) {
            p.ma5 = ma;
        }
    }
    if closes.len() >= 20 {
        for (p, ma) in points.iter_mut().zip(moving_average(&closes, 20)) {
            p.ma20 = ma;
        }
    }
    points
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Summary cards. Every field is `None` for an empty input.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartSummary {
    pub latest_close: Option<f64>,
    pub avg_close: Option<f64>,
    pub highest_price: Option<f64>,
    pub lowest_price: Option<f64>,
    pub latest_volume: Option<i64>,
    pub avg_volume: Option<f64>,
    pub highest_volume: Option<i64>,
    pub lowest_volume: Option<i64>,
}

/// Computed over the full input in its given order, not the date-cut series.
pub fn summarize(records: &[&StockRecord]) -> ChartSummary {
    let Some(latest) = records.last() else {
        return ChartSummary::default();
    };

    let n = records.len() as f64;
    let closes: Vec<f64> = records.iter().map(|r| to_float(&r.close)).collect();
    let volumes: Vec<i64> = records.iter().map(|r| to_int(&r.volume)).collect();

    let highest_price = records
        .iter()
        .map(|r| to_float(&r.high))
        .fold(f64::NEG_INFINITY, f64::max);
    let lowest_price = records
        .iter()
        .map(|r| to_float(&r.low))
        .fold(f64::INFINITY, f64::min);

    ChartSummary {
        latest_close: Some(to_float(&latest.close)),
        avg_close: Some(closes.iter().sum::<f64>() / n),
        highest_price: Some(highest_price),
        lowest_price: Some(lowest_price),
        latest_volume: Some(to_int(&latest.volume)),
        avg_volume: Some(volumes.iter().map(|v| *v as f64).sum::<f64>() / n),
        highest_volume: volumes.iter().copied().max(),
        lowest_volume: volumes.iter().copied().min(),
    }
}

fn price_or_na(v: Option<f64>) -> String {
    v.map(fmt_price).unwrap_or_else(|| "N/A".to_string())
}

fn volume_or_na(v: Option<i64>) -> String {
    v.map(fmt_number).unwrap_or_else(|| "N/A".to_string())
}

impl fmt::Display for ChartSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Latest close   : {}", price_or_na(self.latest_close))?;
        writeln!(f, "  Average close  : {}", price_or_na(self.avg_close))?;
        writeln!(f, "  Highest price  : {}", price_or_na(self.highest_price))?;
        writeln!(f, "  Lowest price   : {}", price_or_na(self.lowest_price))?;
        writeln!(f, "  Latest volume  : {}", volume_or_na(self.latest_volume))?;
        writeln!(
            f,
            "  Average volume : {}",
            volume_or_na(self.avg_volume.map(|v| v.round() as i64))
        )?;
        writeln!(f, "  Highest volume : {}", volume_or_na(self.highest_volume))?;
        write!(f, "  Lowest volume  : {}", volume_or_na(self.lowest_volume))
    }
}
