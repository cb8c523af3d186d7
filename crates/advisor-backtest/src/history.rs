//! Price History
//!
//! Daily OHLC bars for the backtested index, loaded from the exchange's CSV
//! exports. Monetary values stay in `Decimal`; conversion to `f64` happens
//! only at the statistics boundary.

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// One trading day of the index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(rename = "Date", deserialize_with = "deserialize_date")]
    pub date: NaiveDate,

    #[serde(rename = "Open", deserialize_with = "deserialize_price")]
    pub open: Decimal,

    #[serde(rename = "High", deserialize_with = "deserialize_price")]
    pub high: Decimal,

    #[serde(rename = "Low", deserialize_with = "deserialize_price")]
    pub low: Decimal,

    #[serde(rename = "Close", deserialize_with = "deserialize_price")]
    pub close: Decimal,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: Decimal) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    /// Closing price at the statistics boundary.
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or_default()
    }
}

/// Exchange exports use "23-Jan-2025".
fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), "%d-%b-%Y").map_err(serde::de::Error::custom)
}

/// Exchange exports group thousands with commas ("23,207.40").
fn deserialize_price<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .replace(',', "")
        .parse::<Decimal>()
        .map_err(serde::de::Error::custom)
}

/// Sorted, de-duplicated daily price series with trading-day-aware lookups.
#[derive(Clone, Debug, Default)]
pub struct PriceHistory {
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    /// Build from bars in any order; duplicates (by date) keep the first
    /// occurrence.
    pub fn from_bars(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        let before = bars.len();
        bars.dedup_by_key(|bar| bar.date);
        if bars.len() < before {
            tracing::warn!("Dropped {} duplicate dates", before - bars.len());
        }
        Self { bars }
    }

    /// Load one CSV export.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv_files(&[path.as_ref().to_path_buf()])
    }

    /// Load and merge several CSV exports (one file per year, typically).
    pub fn from_csv_files(paths: &[std::path::PathBuf]) -> Result<Self> {
        let mut bars = Vec::new();
        for path in paths {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_path(path)?;
            let mut count = 0usize;
            for row in reader.deserialize::<PriceBar>() {
                bars.push(row?);
                count += 1;
            }
            tracing::info!("Loaded {} rows from {}", count, path.display());
        }

        let history = Self::from_bars(bars);
        if let (Some(first), Some(last)) = (history.first_date(), history.last_date()) {
            tracing::info!(
                "Price history: {} trading days, {first} to {last}",
                history.len()
            );
        }
        Ok(history)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|bar| bar.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|bar| bar.date)
    }

    /// Closing price on an exact trading day.
    pub fn price_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.bars
            .binary_search_by_key(&date, |bar| bar.date)
            .ok()
            .map(|index| self.bars[index].close)
    }

    /// Up to `days` bars ending at `date` (inclusive). Dates that fall
    /// between trading days are handled naturally: the window ends at the
    /// last bar on or before `date`.
    pub fn window_ending(&self, date: NaiveDate, days: usize) -> &[PriceBar] {
        let end = self.bars.partition_point(|bar| bar.date <= date);
        let start = end.saturating_sub(days);
        &self.bars[start..end]
    }

    /// Closing price on the n-th trading day strictly after `date`.
    pub fn price_after_trading_days(&self, date: NaiveDate, days_ahead: usize) -> Option<Decimal> {
        if days_ahead == 0 {
            return self.price_on(date);
        }
        let start = self.bars.partition_point(|bar| bar.date <= date);
        let target = start + days_ahead - 1;
        self.bars.get(target).map(|bar| bar.close)
    }

    /// Percentage return between two trading days' closes.
    pub fn return_between(&self, start: NaiveDate, end: NaiveDate) -> Option<f64> {
        let start_price = self.price_on(start)?.to_f64()?;
        let end_price = self.price_on(end)?.to_f64()?;
        if start_price > 0.0 {
            Some((end_price - start_price) / start_price * 100.0)
        } else {
            None
        }
    }

    /// Trading days inside an inclusive date range.
    pub fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.bars
            .iter()
            .filter(|bar| bar.date >= start && bar.date <= end)
            .map(|bar| bar.date)
            .collect()
    }

    /// Split into (on-or-before, after) around a date for train/test phases.
    pub fn split_at(&self, date: NaiveDate) -> (Self, Self) {
        let index = self.bars.partition_point(|bar| bar.date <= date);
        (
            Self {
                bars: self.bars[..index].to_vec(),
            },
            Self {
                bars: self.bars[index..].to_vec(),
            },
        )
    }
}
