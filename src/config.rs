//! Optimizer configuration and blocklist source definitions.

use reqwest::Url;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::progress::ProgressTracker;

/// Lowest allowed worker count.
pub const MIN_THREADS: usize = 1;
/// Highest allowed worker count.
pub const MAX_THREADS: usize = 16;
/// HTTP timeout used when none (or zero) is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for a [`BlocklistManager`](crate::BlocklistManager) run.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Source list (`url|name|category` per line)
    pub config_file: PathBuf,
    /// Whitelist file
    pub whitelist_file: PathBuf,
    /// Progress store (ETag / Last-Modified cache)
    pub progress_file: PathBuf,
    /// Directory for per-source lists, one subdirectory per category
    pub base_dir: PathBuf,
    /// Directory for combined production lists
    pub prod_dir: PathBuf,
    /// Concurrent downloads
    pub threads: usize,
    /// HTTP timeout in seconds
    pub timeout: u64,
    /// Reuse local files instead of downloading
    pub skip_download: bool,
    /// Skip writing production lists
    pub skip_optimize: bool,
    /// Send conditional requests using cached validators
    pub incremental: bool,
    /// Only report what would be done
    pub dry_run: bool,
    /// Treat whitelist exact entries as covering subdomains
    pub whitelist_subdomain: bool,
    /// Write `whitelist_report.txt`
    pub whitelist_report: bool,
    /// Categories left out of the master list
    pub excluded_categories: BTreeSet<String>,
    /// Draw a progress bar while downloading
    pub show_progress: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("blocklists.conf"),
            whitelist_file: PathBuf::from("whitelist.txt"),
            progress_file: PathBuf::from("download_progress.json"),
            base_dir: PathBuf::from("pihole_blocklists"),
            prod_dir: PathBuf::from("pihole_blocklists_prod"),
            threads: 4,
            timeout: DEFAULT_TIMEOUT_SECS,
            skip_download: false,
            skip_optimize: false,
            incremental: true,
            dry_run: false,
            whitelist_subdomain: true,
            whitelist_report: false,
            excluded_categories: BTreeSet::from(["nsfw".to_string()]),
            show_progress: false,
        }
    }
}

impl OptimizerConfig {
    /// Clamp the worker count and replace a zero timeout with the default.
    pub fn sanitized(mut self) -> Self {
        self.threads = self.threads.clamp(MIN_THREADS, MAX_THREADS);
        if self.timeout == 0 {
            self.timeout = DEFAULT_TIMEOUT_SECS;
        }
        self
    }

    /// HTTP timeout as a [`Duration`].
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Directory holding the per-source files of `category`.
    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.base_dir.join(category)
    }
}

/// One blocklist to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlocklistSource {
    pub url: String,
    pub name: String,
    pub category: String,
    /// Cached ETag from the previous run
    pub etag: Option<String>,
    /// Cached Last-Modified from the previous run
    pub last_modified: Option<String>,
}

/// Parse source definitions, attaching cached validators from `progress`.
///
/// Malformed lines are warned about and skipped.
pub fn parse_sources(content: &str, progress: &ProgressTracker) -> Vec<BlocklistSource> {
    let mut sources = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let [url, name, category] = parts[..] else {
            log::warn!("Invalid format on line {}: {}", line_num + 1, line);
            continue;
        };

        if !is_valid_url(url) {
            log::warn!("Invalid URL on line {}: {}", line_num + 1, url);
            continue;
        }
        if name.is_empty() || category.is_empty() {
            log::warn!("Missing name or category on line {}: {}", line_num + 1, line);
            continue;
        }

        let cached = progress.get(name);
        sources.push(BlocklistSource {
            url: url.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            etag: cached.and_then(|c| c.etag.clone()),
            last_modified: cached.and_then(|c| c.last_modified.clone()),
        });
    }

    sources
}

/// Load source definitions from a file.
///
/// A missing file, or one without a single valid source, is an error.
pub fn load_sources(path: &Path, progress: &ProgressTracker) -> Result<Vec<BlocklistSource>> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "configuration file {:?} not found",
            path
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let sources = parse_sources(&content, progress);
    if sources.is_empty() {
        return Err(Error::Config(
            "no valid blocklists found in configuration file".to_string(),
        ));
    }

    let categories: BTreeSet<&str> = sources.iter().map(|s| s.category.as_str()).collect();
    log::info!(
        "Loaded {} blocklists in {} categories",
        sources.len(),
        categories.len()
    );

    Ok(sources)
}

fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}
