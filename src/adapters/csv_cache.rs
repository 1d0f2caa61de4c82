//! Day-scoped CSV cache in front of any [`QuotePort`].
//!
//! Files are named `{endpoint}_{hash8}_{YYYYMMDD}.csv`, so an entry is reused
//! only on the local calendar day it was written. Unreadable or empty files
//! are removed and refetched; empty results are never stored.

use crate::domain::error::{FetchError, StockStudyError};
use crate::domain::quote::{RawDailyBar, RawFinancialStatement, RawListedInfo};
use crate::ports::quote_port::QuotePort;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

pub struct CsvCache<P> {
    inner: P,
    dir: PathBuf,
    write_lock: Mutex<()>,
}

/// First eight hex digits of the SHA-256 of the canonical parameter string.
pub fn params_hash(params: &str) -> String {
    let digest = Sha256::digest(params.as_bytes());
    hex::encode(digest)[..8].to_string()
}

pub fn cache_file_name(endpoint: &str, params: &str, day: NaiveDate) -> String {
    format!(
        "{}_{}_{}.csv",
        endpoint,
        params_hash(params),
        day.format("%Y%m%d")
    )
}

impl<P: QuotePort> CsvCache<P> {
    pub fn new<D: Into<PathBuf>>(inner: P, dir: D) -> Self {
        Self {
            inner,
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cache_path(&self, endpoint: &str, params: &str) -> PathBuf {
        self.dir
            .join(cache_file_name(endpoint, params, Local::now().date_naive()))
    }

    fn cached<T, F>(&self, endpoint: &str, params: &str, fetch: F) -> Result<Vec<T>, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&P) -> Result<Vec<T>, FetchError>,
    {
        let path = self.cache_path(endpoint, params);
        if let Some(rows) = read_cache(&path) {
            debug!(path = %path.display(), rows = rows.len(), "cache hit");
            return Ok(rows);
        }

        let rows = fetch(&self.inner)?;
        if rows.is_empty() {
            info!(path = %path.display(), "empty result not cached");
            return Ok(rows);
        }
        if let Err(e) = self.write_cache(&path, &rows) {
            warn!(error = %e, "failed to write cache entry");
        }
        Ok(rows)
    }

    fn write_cache<T: Serialize>(&self, path: &Path, rows: &[T]) -> Result<(), StockStudyError> {
        let cache_err = |reason: String| StockStudyError::Cache {
            path: path.display().to_string(),
            reason,
        };

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| cache_err(format!("write lock poisoned: {}", e)))?;

        fs::create_dir_all(&self.dir)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| cache_err("cache path has no file name".into()))?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", file_name, std::process::id()));

        if let Err(e) = write_rows(&tmp, rows).and_then(|()| Ok(fs::rename(&tmp, path)?)) {
            remove_quietly(&tmp);
            return Err(e);
        }
        debug!(path = %path.display(), rows = rows.len(), "cache entry written");
        Ok(())
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StockStudyError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Cached rows, or `None` on a miss. Corrupt or empty files are deleted.
fn read_cache<T: DeserializeOwned>(path: &Path) -> Option<Vec<T>> {
    if !path.exists() {
        return None;
    }

    let parsed = csv::Reader::from_path(path).and_then(|mut rdr| {
        let rows: Result<Vec<T>, csv::Error> = rdr.deserialize().collect();
        rows
    });
    match parsed {
        Ok(rows) if rows.is_empty() => {
            info!(path = %path.display(), "removing empty cache file");
            remove_quietly(path);
            None
        }
        Ok(rows) => Some(rows),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "removing corrupt cache file");
            remove_quietly(path);
            None
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove cache file");
    }
}

impl<P: QuotePort> QuotePort for CsvCache<P> {
    fn daily_quotes(
        &self,
        code: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<RawDailyBar>, FetchError> {
        let params = format!("code={}&from={}&to={}", code, from, to);
        self.cached("daily", &params, |inner| inner.daily_quotes(code, from, to))
    }

    fn stock_master(&self, code: &str) -> Result<Vec<RawListedInfo>, FetchError> {
        let params = format!("code={}", code);
        self.cached("master", &params, |inner| inner.stock_master(code))
    }

    fn financials(&self, code: &str) -> Result<Vec<RawFinancialStatement>, FetchError> {
        let params = format!("code={}", code);
        self.cached("financials", &params, |inner| inner.financials(code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub cache_dir: String,
    pub file_count: usize,
    pub total_size_bytes: u64,
}

/// Count and total size of the `*.csv` files directly under `dir`.
pub fn cache_stats(dir: &Path) -> Result<CacheStats, StockStudyError> {
    let mut stats = CacheStats {
        cache_dir: dir.display().to_string(),
        file_count: 0,
        total_size_bytes: 0,
    };
    if !dir.exists() {
        return Ok(stats);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            let meta = entry.metadata()?;
            if meta.is_file() {
                stats.file_count += 1;
                stats.total_size_bytes += meta.len();
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingPort {
        bars: Vec<RawDailyBar>,
        calls: AtomicUsize,
    }

    impl QuotePort for CountingPort {
        fn daily_quotes(&self, code: &str, _: &str, _: &str) -> Result<Vec<RawDailyBar>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .bars
                .iter()
                .filter(|b| code.is_empty() || b.code == code)
                .cloned()
                .collect())
        }

        fn stock_master(&self, _: &str) -> Result<Vec<RawListedInfo>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RawListedInfo {
                code: "72030".into(),
                company_name: Some("トヨタ自動車".into()),
                ..RawListedInfo::default()
            }])
        }

        fn financials(&self, code: &str) -> Result<Vec<RawFinancialStatement>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RawFinancialStatement {
                code: code.to_string(),
                disclosed_date: Some("2024-05-08".into()),
                net_sales: Some("45095325000000".into()),
                ..RawFinancialStatement::default()
            }])
        }
    }

    fn port() -> CountingPort {
        CountingPort {
            bars: vec![
                RawDailyBar {
                    date: "2024-01-04".into(),
                    code: "72030".into(),
                    close: Some(2640.0),
                    adjustment_close: Some(2640.0),
                    ..RawDailyBar::default()
                },
                RawDailyBar {
                    date: "2024-01-05".into(),
                    code: "72030".into(),
                    close: Some(2650.5),
                    ..RawDailyBar::default()
                },
            ],
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn file_name_layout() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let name = cache_file_name("daily", "code=72030&from=&to=", day);
        assert!(name.starts_with("daily_"));
        assert!(name.ends_with("_20240104.csv"));
        assert_eq!(name.len(), "daily_".len() + 8 + "_20240104.csv".len());
        assert_ne!(params_hash("code=72030"), params_hash("code=67580"));
    }

    #[test]
    fn second_call_is_served_from_disk() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());

        let first = cache.daily_quotes("72030", "", "").unwrap();
        let second = cache.daily_quotes("72030", "", "").unwrap();

        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(second[1].adjustment_close, None);
        assert!(cache.cache_path("daily", "code=72030&from=&to=").exists());
    }

    #[test]
    fn distinct_parameters_use_distinct_files() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());
        cache.daily_quotes("72030", "", "").unwrap();
        cache.daily_quotes("72030", "20240101", "").unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache_stats(dir.path()).unwrap().file_count, 2);
    }

    #[test]
    fn master_round_trips_text() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());
        cache.stock_master("").unwrap();
        let cached = cache.stock_master("").unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached[0].company_name.as_deref(), Some("トヨタ自動車"));
    }

    #[test]
    fn financials_are_cached_per_code() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());
        cache.financials("72030").unwrap();
        let cached = cache.financials("72030").unwrap();

        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached[0].net_sales.as_deref(), Some("45095325000000"));
        assert_eq!(cached[0].earnings_per_share, None);
        let name = cache.cache_path("financials", "code=72030");
        assert!(name.file_name().unwrap().to_string_lossy().starts_with("financials_"));
        assert!(name.exists());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());
        // a directory in the entry's place makes the final rename fail
        fs::create_dir(cache.cache_path("daily", "code=72030&from=&to=")).unwrap();

        let rows = cache.daily_quotes("72030", "", "").unwrap();
        assert_eq!(rows.len(), 2);

        let leftovers: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }

    #[test]
    fn empty_result_is_not_written() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());
        assert!(cache.daily_quotes("99999", "", "").unwrap().is_empty());
        assert!(!cache.cache_path("daily", "code=99999&from=&to=").exists());
    }

    #[test]
    fn empty_cache_file_is_deleted_and_refetched() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());
        let path = cache.cache_path("daily", "code=72030&from=&to=");
        fs::write(&path, "Date,Code,C\n").unwrap();

        let rows = cache.daily_quotes("72030", "", "").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn corrupt_cache_file_is_deleted_and_refetched() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(port(), dir.path());
        let path = cache.cache_path("daily", "code=72030&from=&to=");
        fs::write(&path, "Date,Code,C\n2024-01-04,72030,not-a-number\n").unwrap();

        let rows = cache.daily_quotes("72030", "", "").unwrap();
        assert_eq!(rows[0].close, Some(2640.0));
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);

        // rewritten with good content
        let again = cache.daily_quotes("72030", "", "").unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stats_count_only_csv_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.csv"), "12345").unwrap();
        fs::write(dir.path().join("b.csv"), "123").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let stats = cache_stats(dir.path()).unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size_bytes, 8);
    }

    #[test]
    fn stats_for_missing_dir_are_zero() {
        let dir = TempDir::new().unwrap();
        let stats = cache_stats(&dir.path().join("absent")).unwrap();
        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.total_size_bytes, 0);
    }
}
