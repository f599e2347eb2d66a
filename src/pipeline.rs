//! End-to-end blocklist processing: fetch, extract, merge, filter, write.

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::{load_sources, BlocklistSource, OptimizerConfig};
use crate::domain::DomainSet;
use crate::error::Result;
use crate::extract::DomainExtractor;
use crate::fetch::{FetchOutcome, Fetcher, Validators};
use crate::output::{capitalize, format_count, timestamp, write_blocklist};
use crate::progress::ProgressTracker;
use crate::whitelist::{FilterEngine, FilterOptions, ReportFormatter, ReportOptions, Whitelist};

/// Lists and domains obtained for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    /// Lists downloaded or loaded from disk
    pub lists: usize,
    /// Domains extracted from those lists, counted per list
    pub domains: usize,
}

/// A source that could not be obtained, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSource {
    pub source: BlocklistSource,
    pub error: String,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sources in the configuration
    pub total: usize,
    /// Sources downloaded (or loaded from disk) successfully
    pub successful: usize,
    /// Sources the server reported as not modified
    pub skipped: usize,
    /// Sources that could not be obtained
    pub failed: usize,
    /// Unique domains across non-excluded categories, before filtering
    pub unique_domains: usize,
    /// Domains removed from the master list by the whitelist
    pub whitelisted: usize,
    /// Domains in the master list after filtering
    pub final_count: usize,
    /// Wall-clock duration
    pub elapsed: Duration,
    /// Breakdown of successful sources by category
    pub categories: BTreeMap<String, CategoryStats>,
    /// Failed sources in configuration order
    pub failed_sources: Vec<FailedSource>,
}

/// Per-source result of the acquisition phase.
enum SourceStatus {
    /// Fresh content with this many domains
    Loaded(usize),
    NotModified,
    Failed(String),
}

/// Drives one optimizer run.
pub struct BlocklistManager {
    config: OptimizerConfig,
    fetcher: Fetcher,
    progress: Mutex<ProgressTracker>,
    extractor: DomainExtractor,
    engine: FilterEngine,
}

impl BlocklistManager {
    /// Prepare a run: load progress and compile the whitelist.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        let config = config.sanitized();
        let fetcher = Fetcher::new(config.timeout_duration())?;
        let progress = ProgressTracker::load(&config.progress_file);
        let whitelist = Whitelist::load_file(&config.whitelist_file);
        let engine = FilterEngine::new(
            whitelist,
            FilterOptions {
                subdomain_matching: config.whitelist_subdomain,
            },
        );

        Ok(Self {
            config,
            fetcher,
            progress: Mutex::new(progress),
            extractor: DomainExtractor::new(),
            engine,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Whitelist engine, including match lists of the last run.
    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    /// Execute the run.
    pub fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();

        let sources = {
            let progress = self.progress.lock();
            load_sources(&self.config.config_file, &progress)?
        };
        let categories: BTreeSet<&str> = sources.iter().map(|s| s.category.as_str()).collect();

        let mut summary = RunSummary {
            total: sources.len(),
            ..Default::default()
        };

        if self.config.dry_run {
            log::info!(
                "[DRY RUN] Would process {} blocklists in {} categories",
                sources.len(),
                categories.len()
            );
            summary.elapsed = start.elapsed();
            return Ok(summary);
        }

        self.create_directories(&categories)?;

        let merged: Mutex<BTreeMap<String, DomainSet>> = Mutex::new(BTreeMap::new());
        let statuses = if self.config.skip_download {
            log::info!("Skipping downloads, loading existing files...");
            sources
                .iter()
                .map(|source| self.load_local(source, &merged))
                .collect::<Vec<_>>()
        } else {
            log::info!(
                "Downloading {} blocklists with {} threads...",
                sources.len(),
                self.config.threads
            );
            self.download_all(&sources, &merged)
        };

        for (source, status) in sources.iter().zip(statuses) {
            match status {
                SourceStatus::Loaded(count) => {
                    summary.successful += 1;
                    let stats = summary.categories.entry(source.category.clone()).or_default();
                    stats.lists += 1;
                    stats.domains += count;
                }
                SourceStatus::NotModified => summary.skipped += 1,
                SourceStatus::Failed(error) => summary.failed_sources.push(FailedSource {
                    source: source.clone(),
                    error,
                }),
            }
        }
        summary.failed = summary.failed_sources.len();

        let category_domains = merged.into_inner();
        summary.unique_domains = self.master_domains(&category_domains).len();
        summary.final_count = summary.unique_domains;

        if !self.config.skip_optimize {
            let (whitelisted, final_count) = self.create_production_lists(&category_domains)?;
            summary.whitelisted = whitelisted;
            summary.final_count = final_count;
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    fn create_directories(&self, categories: &BTreeSet<&str>) -> Result<()> {
        fs::create_dir_all(&self.config.base_dir)?;
        for category in categories {
            fs::create_dir_all(self.config.category_dir(category))?;
        }
        fs::create_dir_all(&self.config.prod_dir)?;
        Ok(())
    }

    fn optimized_path(&self, source: &BlocklistSource) -> PathBuf {
        self.config
            .category_dir(&source.category)
            .join(format!("{}.txt", source.name))
    }

    fn raw_path(&self, source: &BlocklistSource) -> PathBuf {
        self.config
            .category_dir(&source.category)
            .join(format!("{}.txt.raw", source.name))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        match ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::debug!("Progress bar template rejected: {}", e),
        }
        bar
    }

    /// Fetch every source on a pool of worker threads.
    ///
    /// Each worker extracts and merges its own results; the merge is a set
    /// union so completion order does not matter. Statuses come back in
    /// source order.
    fn download_all(
        &self,
        sources: &[BlocklistSource],
        merged: &Mutex<BTreeMap<String, DomainSet>>,
    ) -> Vec<SourceStatus> {
        let next = &AtomicUsize::new(0);
        let workers = self.config.threads.min(sources.len()).max(1);
        let bar = &self.progress_bar(sources.len());

        let mut statuses: Vec<Option<SourceStatus>> = sources.iter().map(|_| None).collect();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(source) = sources.get(i) else {
                                break;
                            };
                            done.push((i, self.download_one(source, merged)));
                            bar.inc(1);
                        }
                        done
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (i, status) in done {
                            statuses[i] = Some(status);
                        }
                    }
                    Err(_) => log::error!("Download worker panicked"),
                }
            }
        });
        bar.finish_and_clear();

        statuses
            .into_iter()
            .map(|status| {
                status.unwrap_or_else(|| SourceStatus::Failed("download worker panicked".to_string()))
            })
            .collect()
    }

    fn download_one(
        &self,
        source: &BlocklistSource,
        merged: &Mutex<BTreeMap<String, DomainSet>>,
    ) -> SourceStatus {
        let validators = if self.config.incremental {
            Validators {
                etag: source.etag.as_deref(),
                last_modified: source.last_modified.as_deref(),
            }
        } else {
            Validators::default()
        };

        match self.fetcher.fetch(&source.url, validators) {
            Err(e) => {
                log::error!("  {}: {}", source.name, e);
                SourceStatus::Failed(e.to_string())
            }
            Ok(FetchOutcome::NotModified) => {
                log::debug!("  {}: Not modified (skipped)", source.name);
                let path = self.optimized_path(source);
                if path.exists() {
                    match fs::read(&path) {
                        Ok(content) => merge(merged, source, self.extractor.extract_domains(&content)),
                        Err(e) => log::warn!("  {}: Failed to read local copy - {}", source.name, e),
                    }
                }
                SourceStatus::NotModified
            }
            Ok(FetchOutcome::Modified(download)) => {
                let domains = self.extractor.extract_domains(&download.content);
                let count = domains.len();
                if count == 0 {
                    log::warn!("  {}: No valid domains extracted", source.name);
                }

                if let Err(e) = fs::write(self.raw_path(source), &download.content) {
                    log::warn!("Failed to write raw file for {}: {}", source.name, e);
                }
                if let Err(e) = write_blocklist(&self.optimized_path(source), &domains, "Optimized") {
                    log::warn!("Failed to write optimized file for {}: {}", source.name, e);
                }

                self.progress.lock().update(
                    &source.name,
                    download.etag.as_deref(),
                    download.last_modified.as_deref(),
                    count,
                );

                log::debug!("  {}: {} domains", source.name, count);
                merge(merged, source, domains);
                SourceStatus::Loaded(count)
            }
        }
    }

    fn load_local(
        &self,
        source: &BlocklistSource,
        merged: &Mutex<BTreeMap<String, DomainSet>>,
    ) -> SourceStatus {
        let path = self.optimized_path(source);
        if !path.exists() {
            log::warn!("  {}: No local file found", source.name);
            return SourceStatus::Failed(format!("no local file at {:?}", path));
        }

        match fs::read(&path) {
            Ok(content) => {
                let domains = self.extractor.extract_domains(&content);
                let count = domains.len();
                log::debug!("  {}: {} domains (from file)", source.name, count);
                merge(merged, source, domains);
                SourceStatus::Loaded(count)
            }
            Err(e) => {
                log::warn!("  {}: Failed to load - {}", source.name, e);
                SourceStatus::Failed(e.to_string())
            }
        }
    }

    /// Union of every category not excluded from the master list.
    fn master_domains(&self, category_domains: &BTreeMap<String, DomainSet>) -> DomainSet {
        let mut all = DomainSet::default();
        for (category, domains) in category_domains {
            if !self.config.excluded_categories.contains(category) {
                all.extend(domains.iter().cloned());
            }
        }
        all
    }

    fn create_production_lists(
        &mut self,
        category_domains: &BTreeMap<String, DomainSet>,
    ) -> Result<(usize, usize)> {
        log::info!("Creating production blocklists...");

        let all_domains = self.master_domains(category_domains);

        log::info!("Applying whitelist filtering...");
        self.engine.clear_matches();
        let (filtered, removed) = self.engine.filter(&all_domains, true);

        let master_path = self.config.prod_dir.join("all_domains.txt");
        write_blocklist(&master_path, &filtered, "Master")?;
        log::info!(
            "Created Master blocklist: {} domains",
            format_count(filtered.len())
        );

        for (category, domains) in category_domains {
            if domains.is_empty() {
                continue;
            }
            let (category_filtered, _) = self.engine.filter(domains, false);
            let label = capitalize(category);
            let path = self.config.prod_dir.join(format!("{}.txt", category));
            write_blocklist(&path, &category_filtered, &label)?;
            log::info!(
                "Created {} blocklist: {} domains",
                label,
                format_count(category_filtered.len())
            );
        }

        if self.config.whitelist_report && removed > 0 {
            let report_path = self.config.prod_dir.join("whitelist_report.txt");
            self.write_report(&report_path)?;
        }

        Ok((removed, filtered.len()))
    }

    fn write_report(&self, path: &Path) -> Result<()> {
        let formatter = ReportFormatter::new(ReportOptions {
            generated_at: Some(timestamp()),
            ..Default::default()
        });
        fs::write(path, formatter.format(self.engine.entries()))?;
        log::info!("Whitelist report saved to: {:?}", path);
        Ok(())
    }
}

fn merge(merged: &Mutex<BTreeMap<String, DomainSet>>, source: &BlocklistSource, domains: DomainSet) {
    let mut guard = merged.lock();
    let set = guard.entry(source.category.clone()).or_default();
    if set.is_empty() {
        *set = domains;
    } else {
        set.extend(domains);
    }
}
