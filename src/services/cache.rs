use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

/// File-per-entry cache for geocoding and map-data payloads.
///
/// Each entry is a JSON file named after the sanitized cache key. Entries are
/// never invalidated: upstream map data drifts over time and serving a stale
/// snapshot is an accepted trade-off, not a bug.
pub struct GeometryCache {
    dir: PathBuf,
}

impl GeometryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache file path for a key, with path separators replaced so every
    /// entry lands as a single flat file.
    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Look up a cached payload. Absence is not an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| CacheError::Read(e.to_string()))?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }

    /// Store a payload, creating the cache directory on first use.
    /// Existing entries are overwritten; identical keys mean identical
    /// request parameters, so a collision is legitimate reuse.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::Write(e.to_string()))?;
        let bytes = serde_json::to_vec(value)?;
        std::fs::write(self.entry_path(key), bytes).map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache read failed: {0}")]
    Read(String),

    #[error("Cache write failed: {0}")]
    Write(String),

    #[error("Cache entry malformed: {0}")]
    Decode(#[from] serde_json::Error),
}
