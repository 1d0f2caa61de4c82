//! Filesystem-backed [`ObjectStore`]: each key is a path under a root directory.

use crate::domain::error::StockStudyError;
use crate::ports::object_store_port::ObjectStore;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn store_err(key: &str, reason: impl Into<String>) -> StockStudyError {
        StockStudyError::Store {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Resolve `key` below the root, refusing absolute or parent components.
    fn path_for(&self, key: &str) -> Result<PathBuf, StockStudyError> {
        let relative = Path::new(key);
        if key.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Self::store_err(key, "key must be a relative path"));
        }
        Ok(self.root.join(relative))
    }

    fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<(), StockStudyError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_keys(&path, keys)?;
            } else if let Ok(relative) = path.strip_prefix(&self.root) {
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                // skip in-flight temp files
                if !key.rsplit('/').next().is_some_and(|name| name.starts_with('.')) {
                    keys.push(key);
                }
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>, StockStudyError> {
        let mut keys = Vec::new();
        if self.root.is_dir() {
            self.collect_keys(&self.root, &mut keys)?;
        }
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StockStudyError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| Self::store_err(key, e.to_string()))
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<(), StockStudyError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Self::store_err(key, "key has no file name"))?;
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
