//! Batch pipeline over an [`ObjectStore`]: raw ingest, normalization into the
//! processed layer and technical enrichment into the analytics layer.
//!
//! Partitions are keyed by the JST calendar day of the run:
//! `{layer}/{name}/year=YYYY/month=MM/day=DD/`.

use crate::domain::error::StockStudyError;
use crate::domain::presentation::{TechnicalRecord, normalize_date, technical_records_in};
use crate::domain::quote::{CloseColumn, RawDailyBar, RawFinancialStatement, RawListedInfo};
use crate::ports::object_store_port::ObjectStore;
use crate::ports::quote_port::QuotePort;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

const JST_OFFSET_HOURS: i64 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Master,
    Daily,
    Financials,
}

impl DataType {
    pub const ALL: [DataType; 3] = [DataType::Master, DataType::Daily, DataType::Financials];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Master => "master",
            DataType::Daily => "daily",
            DataType::Financials => "financials",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = StockStudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(DataType::Master),
            "daily" => Ok(DataType::Daily),
            "financials" => Ok(DataType::Financials),
            other => Err(StockStudyError::UnsupportedDataType(other.to_string())),
        }
    }
}

/// Wall-clock time in Tokyo.
pub fn to_jst(now: DateTime<Utc>) -> NaiveDateTime {
    now.naive_utc() + Duration::hours(JST_OFFSET_HOURS)
}

/// `{layer}/{name}/year=YYYY/month=MM/day=DD`, dated in JST.
pub fn partition_prefix(layer: &str, name: &str, now: DateTime<Utc>) -> String {
    let local = to_jst(now);
    format!(
        "{}/{}/{}",
        layer,
        name,
        local.format("year=%Y/month=%m/day=%d")
    )
}

/// Keys ending in `suffix` that share the directory of the greatest such key
/// under `prefix`.
pub fn latest_partition_keys(
    store: &dyn ObjectStore,
    prefix: &str,
    suffix: &str,
) -> Result<Vec<String>, StockStudyError> {
    let mut keys: Vec<String> = store
        .list(prefix)?
        .into_iter()
        .filter(|k| k.ends_with(suffix))
        .collect();
    keys.sort();

    let Some(latest) = keys.last() else {
        return Ok(Vec::new());
    };
    let dir = match latest.rsplit_once('/') {
        Some((dir, _)) => format!("{}/", dir),
        None => String::new(),
    };
    Ok(keys
        .iter()
        .filter(|k| k.starts_with(&dir))
        .cloned()
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Empty,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub status: IngestStatus,
    pub data_type: DataType,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Fetch one data type from upstream and store it as a raw JSON array.
pub fn ingest(
    quotes: &dyn QuotePort,
    store: &dyn ObjectStore,
    data_type: DataType,
    from: &str,
    to: &str,
    now: DateTime<Utc>,
) -> Result<IngestOutcome, StockStudyError> {
    info!(%data_type, from, to, "ingest started");

    let (body, record_count) = match data_type {
        DataType::Master => {
            let rows = quotes.stock_master("")?;
            (serde_json::to_vec(&rows)?, rows.len())
        }
        DataType::Daily => {
            let rows = quotes.daily_quotes("", from, to)?;
            (serde_json::to_vec(&rows)?, rows.len())
        }
        DataType::Financials => {
            let rows = quotes.financials("")?;
            (serde_json::to_vec(&rows)?, rows.len())
        }
    };

    if record_count == 0 {
        warn!(%data_type, "upstream returned no rows");
        return Ok(IngestOutcome {
            status: IngestStatus::Empty,
            data_type,
            record_count: 0,
            key: None,
        });
    }

    let key = format!(
        "{}/{}_{}.json",
        partition_prefix("raw", data_type.as_str(), now),
        data_type,
        to_jst(now).format("%Y%m%d_%H%M%S")
    );
    store.put(&key, &body)?;
    info!(%data_type, %key, record_count, "raw partition written");

    Ok(IngestOutcome {
        status: IngestStatus::Success,
        data_type,
        record_count,
        key: Some(key),
    })
}

/// Normalize the latest raw partition of `data_type` into the processed
/// layer. Returns the number of rows written.
pub fn transform(
    store: &dyn ObjectStore,
    data_type: DataType,
    now: DateTime<Utc>,
) -> Result<usize, StockStudyError> {
    let prefix = format!("raw/{}/", data_type);
    let keys = latest_partition_keys(store, &prefix, ".json")?;
    if keys.is_empty() {
        warn!(%data_type, "no raw data found");
        return Ok(0);
    }

    let out_key = format!(
        "{}/{}.csv",
        partition_prefix("processed", data_type.as_str(), now),
        data_type
    );
    let count = match data_type {
        DataType::Master => {
            let rows: Vec<RawListedInfo> = read_json_rows(store, &keys)?;
            write_csv(store, &out_key, &rows)?
        }
        DataType::Daily => {
            let mut rows: Vec<RawDailyBar> = read_json_rows(store, &keys)?;
            for row in &mut rows {
                row.date = normalize_date(&row.date);
            }
            write_csv(store, &out_key, &rows)?
        }
        DataType::Financials => {
            let mut rows: Vec<RawFinancialStatement> = read_json_rows(store, &keys)?;
            for row in &mut rows {
                row.code = row.code.trim().to_string();
                if let Some(date) = row.disclosed_date.as_mut() {
                    *date = normalize_date(date);
                }
            }
            write_csv(store, &out_key, &rows)?
        }
    };

    if count > 0 {
        info!(%data_type, key = %out_key, count, "processed partition written");
    }
    Ok(count)
}

/// Row of the analytics layer: one instrument-date with its indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalRow {
    pub code: String,
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub sma_5: Option<f64>,
    pub sma_25: Option<f64>,
    pub sma_75: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl TechnicalRow {
    fn new(code: &str, record: TechnicalRecord) -> Self {
        TechnicalRow {
            code: code.to_string(),
            date: record.date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
            sma_5: record.sma_5,
            sma_25: record.sma_25,
            sma_75: record.sma_75,
            rsi_14: record.rsi_14,
            macd: record.macd,
            macd_signal: record.macd_signal,
            macd_histogram: record.macd_histogram,
            bb_upper: record.bb_upper,
            bb_middle: record.bb_middle,
            bb_lower: record.bb_lower,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichOutcome {
    pub instruments: usize,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Compute indicators per instrument over the latest processed daily
/// partition and write them to the analytics layer. Closes are always `AdjC`.
pub fn enrich(
    store: &dyn ObjectStore,
    now: DateTime<Utc>,
) -> Result<EnrichOutcome, StockStudyError> {
    let keys = latest_partition_keys(store, "processed/daily/", ".csv")?;
    if keys.is_empty() {
        warn!("no processed daily data found");
        return Ok(EnrichOutcome::default());
    }

    let mut bars: Vec<RawDailyBar> = Vec::new();
    for key in &keys {
        bars.extend(read_csv_rows::<RawDailyBar>(store, key)?);
    }
    info!(rows = bars.len(), "processed daily rows loaded");

    if !bars.iter().any(|b| b.adjustment_close.is_some()) {
        warn!("no adjusted close column values, skipping enrichment");
        return Ok(EnrichOutcome::default());
    }

    let mut by_code: BTreeMap<String, Vec<RawDailyBar>> = BTreeMap::new();
    for bar in bars {
        by_code.entry(bar.code.clone()).or_default().push(bar);
    }

    let mut rows = Vec::new();
    let mut instruments = 0;
    for (code, group) in &by_code {
        if group.len() < 2 {
            continue;
        }
        instruments += 1;
        rows.extend(
            technical_records_in(group, CloseColumn::Adjusted)
                .into_iter()
                .map(|record| TechnicalRow::new(code, record)),
        );
    }

    if rows.is_empty() {
        warn!("no instrument has enough rows for indicators");
        return Ok(EnrichOutcome::default());
    }

    let key = format!("{}/technical.csv", partition_prefix("analytics", "technical", now));
    let record_count = write_csv(store, &key, &rows)?;
    info!(%key, instruments, record_count, "technical indicators written");

    Ok(EnrichOutcome {
        instruments,
        record_count,
        key: Some(key),
    })
}

fn read_json_rows<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    keys: &[String],
) -> Result<Vec<T>, StockStudyError> {
    let mut rows = Vec::new();
    for key in keys {
        let body = store.get(key)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let parsed: Vec<T> = serde_json::from_slice(&body).map_err(|e| StockStudyError::Store {
            key: key.clone(),
            reason: format!("invalid JSON: {}", e),
        })?;
        rows.extend(parsed);
    }
    Ok(rows)
}

fn read_csv_rows<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> Result<Vec<T>, StockStudyError> {
    let body = store.get(key)?;
    let mut rdr = csv::Reader::from_reader(body.as_slice());
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Serialize rows as CSV under `key`; nothing is written for no rows.
fn write_csv<T: Serialize>(
    store: &dyn ObjectStore,
    key: &str,
    rows: &[T],
) -> Result<usize, StockStudyError> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    let body = wtr
        .into_inner()
        .map_err(|e| StockStudyError::Io(e.into_error()))?;
    store.put(key, &body)?;
    Ok(rows.len())
}
