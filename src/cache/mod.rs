//! Durable HTML page cache
//!
//! The cache is a path -> HTML map persisted as a single JSON document.
//! It is loaded once at startup; every `put` rewrites the whole document
//! to disk before returning, so a crash right after a successful fetch
//! never loses that page. Eligibility decisions (when a cached page may
//! stand in for a live fetch) belong to the caller.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// In-memory HTML cache backed by a single JSON file
pub struct HtmlCache {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl HtmlCache {
    /// Loads the cache from disk, or starts empty if the file is absent
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the JSON cache document
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlCache)` - Cache loaded (possibly empty)
    /// * `Err(CacheError)` - The file exists but could not be read or parsed
    pub fn load(path: &Path) -> CacheResult<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Returns the cached HTML for a page path, if present
    pub fn get(&self, page_path: &str) -> Option<&str> {
        self.entries.get(page_path).map(String::as_str)
    }

    /// Returns whether a page path is cached
    pub fn contains(&self, page_path: &str) -> bool {
        self.entries.contains_key(page_path)
    }

    /// Stores a page and flushes the entire cache to disk
    ///
    /// The flush writes to a sibling temp file and renames it over the
    /// document, so the on-disk cache is never a partial write.
    pub fn put(&mut self, page_path: &str, html: &str) -> CacheResult<()> {
        self.entries
            .insert(page_path.to_string(), html.to_string());
        self.flush()
    }

    /// Number of cached pages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache holds no pages
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        let serialized = serde_json::to_string(&self.entries)?;
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_path(dir: &TempDir) -> PathBuf {
        dir.path().join("html_cache.json")
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = HtmlCache::load(&cache_path(&dir)).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let mut cache = HtmlCache::load(&cache_path(&dir)).unwrap();

        cache.put("itemlist123", "<html>page</html>").unwrap();

        assert!(cache.contains("itemlist123"));
        assert_eq!(cache.get("itemlist123"), Some("<html>page</html>"));
        assert_eq!(cache.get("itemlist999"), None);
    }

    #[test]
    fn test_put_persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = cache_path(&dir);

        {
            let mut cache = HtmlCache::load(&path).unwrap();
            cache.put("itemlist123", "<html>a</html>").unwrap();
            cache.put("itemlist456", "<html>b</html>").unwrap();
        }

        let reloaded = HtmlCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("itemlist123"), Some("<html>a</html>"));
        assert_eq!(reloaded.get("itemlist456"), Some("<html>b</html>"));
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let dir = TempDir::new().unwrap();
        let path = cache_path(&dir);

        let mut cache = HtmlCache::load(&path).unwrap();
        cache.put("itemlist123", "<html>old</html>").unwrap();
        cache.put("itemlist123", "<html>new</html>").unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("itemlist123"), Some("<html>new</html>"));

        let reloaded = HtmlCache::load(&path).unwrap();
        assert_eq!(reloaded.get("itemlist123"), Some("<html>new</html>"));
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = cache_path(&dir);
        fs::write(&path, "not json at all").unwrap();

        let result = HtmlCache::load(&path);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
