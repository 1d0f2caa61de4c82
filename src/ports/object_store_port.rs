//! Key/value object storage used by the batch pipeline.

use crate::domain::error::StockStudyError;

/// Flat key space with `/`-separated keys, as in an object bucket.
pub trait ObjectStore {
    /// Keys starting with `prefix`, in ascending order.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StockStudyError>;
    fn get(&self, key: &str) -> Result<Vec<u8>, StockStudyError>;
    fn put(&self, key: &str, body: &[u8]) -> Result<(), StockStudyError>;
}
