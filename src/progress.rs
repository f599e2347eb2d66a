//! Persistent download progress for incremental updates.
//!
//! Stores, per blocklist name, the HTTP validators of the last download so the
//! next run can send conditional requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

/// Progress record of one blocklist.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProgressEntry {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub domain_count: usize,
    #[serde(with = "system_time_serde", default)]
    pub last_download: Option<SystemTime>,
}

mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => {
                let duration = t.duration_since(UNIX_EPOCH).unwrap_or_default();
                Some(duration.as_secs()).serialize(serializer)
            }
            None => None::<u64>.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)))
    }
}

/// Tracks and persists download progress.
pub struct ProgressTracker {
    /// Backing file; `None` keeps progress in memory only
    path: Option<PathBuf>,
    entries: BTreeMap<String, ProgressEntry>,
}

impl ProgressTracker {
    /// Load progress from a file.
    ///
    /// A missing, unreadable or corrupt file yields an empty tracker; the
    /// latter two are logged.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let entries = if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<BTreeMap<String, ProgressEntry>>(&content) {
                    Ok(map) => {
                        log::debug!("Loaded progress for {} lists", map.len());
                        map
                    }
                    Err(e) => {
                        log::warn!("Failed to parse progress file: {}", e);
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read progress file: {}", e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Self {
            path: Some(path.to_path_buf()),
            entries,
        }
    }

    /// Create a tracker that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    /// Get the record of a blocklist.
    pub fn get(&self, name: &str) -> Option<&ProgressEntry> {
        self.entries.get(name)
    }

    /// Number of tracked blocklists.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a successful download and persist immediately.
    ///
    /// Save failures are logged, not returned.
    pub fn update(
        &mut self,
        name: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
        domain_count: usize,
    ) {
        self.entries.insert(
            name.to_string(),
            ProgressEntry {
                etag: etag.map(String::from),
                last_modified: last_modified.map(String::from),
                domain_count,
                last_download: Some(SystemTime::now()),
            },
        );
        if let Err(e) = self.save() {
            log::error!("Failed to save progress: {}", e);
        }
    }

    /// Write all records to the backing file.
    pub fn save(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, content)?;
        Ok(())
    }
}
