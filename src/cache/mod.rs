//! Caching of renaming reports

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use crate::models::report::RenameReport;
use log::debug;

/// On-disk cache of reports, one JSON file per key
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    /// Cache under `~/.objc_stub_fixer/cache`
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(home.join(".objc_stub_fixer").join("cache"))
    }

    /// Cache rooted at `dir`
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the cache file path for a key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Get a cached report
    pub fn get_report(&self, key: &str) -> Result<Option<RenameReport>> {
        let path = self.cache_path(key);

        if !path.exists() {
            debug!("No cache found for key: {}", key);
            return Ok(None);
        }

        debug!("Found cache for key: {}", key);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;

        let report: RenameReport = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse cached report: {}", path.display()))?;

        Ok(Some(report))
    }

    /// Save a report to the cache
    pub fn save_report(&self, key: &str, report: &RenameReport) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;
        }

        let path = self.cache_path(key);
        let json = serde_json::to_string_pretty(report)
            .with_context(|| format!("Failed to serialize report for key: {}", key))?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache file: {}", path.display()))?;

        debug!("Cached report for key: {}", key);
        Ok(())
    }

    /// Clear the cache for a key
    pub fn clear(&self, key: &str) -> Result<()> {
        let path = self.cache_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", path.display()))?;
            debug!("Cleared cache for key: {}", key);
        } else {
            debug!("No cache to clear for key: {}", key);
        }

        Ok(())
    }

    /// Clear all cached reports
    pub fn clear_all(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("Failed to remove cache directory: {}", self.dir.display()))?;
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to recreate cache directory: {}", self.dir.display()))?;
            debug!("Cleared all cached reports");
        } else {
            debug!("No cache directory to clear");
        }

        Ok(())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
