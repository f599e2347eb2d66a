//! End-to-end runs of the optimizer against local files.

use blocklist_optimizer::{BlocklistManager, CategoryStats, OptimizerConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Domains listed in a generated blocklist file, in file order.
fn listed(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter_map(|l| l.strip_prefix("0.0.0.0 "))
        .map(String::from)
        .collect()
}

fn setup(whitelist: &str) -> (TempDir, OptimizerConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        &root.join("blocklists.conf"),
        "# sources\n\
         https://example.com/ads.txt|ads_one|ads\n\
         https://example.com/ads2.txt|ads_two|ads\n\
         https://example.com/priv.txt|privacy_one|privacy\n\
         https://example.com/adult.txt|adult_one|nsfw\n\
         https://example.com/gone.txt|missing_one|ads\n",
    );
    write(
        &root.join("lists/ads/ads_one.txt"),
        "0.0.0.0 ads.example.com\n0.0.0.0 banner.cdn.net\n||track.google.com^\n",
    );
    write(
        &root.join("lists/ads/ads_two.txt"),
        "ads.example.com\npopup.example.org\n",
    );
    write(
        &root.join("lists/privacy/privacy_one.txt"),
        "127.0.0.1 metrics.example.io\n",
    );
    write(&root.join("lists/nsfw/adult_one.txt"), "adult.example.xxx\n");
    write(&root.join("whitelist.txt"), whitelist);

    let config = OptimizerConfig {
        config_file: root.join("blocklists.conf"),
        whitelist_file: root.join("whitelist.txt"),
        progress_file: root.join("progress.json"),
        base_dir: root.join("lists"),
        prod_dir: root.join("prod"),
        skip_download: true,
        whitelist_report: true,
        ..Default::default()
    };
    (dir, config)
}

#[test]
fn test_skip_download_run() {
    let (_dir, config) = setup("google.com\n*.cdn.net\n");
    let prod = config.prod_dir.clone();

    let mut manager = BlocklistManager::new(config).unwrap();
    let summary = manager.run().unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.successful, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    // nsfw is left out of the master list
    assert_eq!(summary.unique_domains, 5);
    assert_eq!(summary.whitelisted, 2);
    assert_eq!(summary.final_count, 3);

    assert_eq!(
        summary.categories["ads"],
        CategoryStats {
            lists: 2,
            domains: 5
        }
    );
    assert_eq!(summary.categories["privacy"].lists, 1);
    assert_eq!(summary.categories["nsfw"].domains, 1);

    assert_eq!(summary.failed_sources.len(), 1);
    let failed = &summary.failed_sources[0];
    assert_eq!(failed.source.name, "missing_one");
    assert_eq!(failed.source.category, "ads");
    assert!(failed.error.contains("no local file"));

    assert_eq!(
        listed(&prod.join("all_domains.txt")),
        vec!["ads.example.com", "metrics.example.io", "popup.example.org"]
    );
    assert_eq!(
        listed(&prod.join("ads.txt")),
        vec!["ads.example.com", "popup.example.org"]
    );
    assert_eq!(listed(&prod.join("privacy.txt")), vec!["metrics.example.io"]);
    assert_eq!(listed(&prod.join("nsfw.txt")), vec!["adult.example.xxx"]);

    let header = fs::read_to_string(prod.join("ads.txt")).unwrap();
    assert!(header.starts_with("# Pi-hole Ads Blocklist\n"));
    let master = fs::read_to_string(prod.join("all_domains.txt")).unwrap();
    assert!(master.contains("# Total domains: 3\n"));

    let report = fs::read_to_string(prod.join("whitelist_report.txt")).unwrap();
    assert!(report.contains("Total Domains Removed: 2\n"));
    assert!(report.contains("Pattern: google.com (exact)\nMatches: 1\n  - track.google.com\n"));
    assert!(report.contains("Pattern: *.cdn.net (wildcard)\nMatches: 1\n  - banner.cdn.net\n"));
}

#[test]
fn test_no_report_without_removals() {
    let (_dir, config) = setup("nothing-matches.com\n");
    let prod = config.prod_dir.clone();

    let mut manager = BlocklistManager::new(config).unwrap();
    let summary = manager.run().unwrap();

    assert_eq!(summary.whitelisted, 0);
    assert_eq!(summary.final_count, summary.unique_domains);
    assert!(prod.join("all_domains.txt").exists());
    assert!(!prod.join("whitelist_report.txt").exists());
}

#[test]
fn test_subdomain_matching_disabled() {
    let (_dir, mut config) = setup("google.com\n");
    config.whitelist_subdomain = false;

    let mut manager = BlocklistManager::new(config).unwrap();
    let summary = manager.run().unwrap();

    assert_eq!(summary.whitelisted, 0);
    assert_eq!(summary.final_count, 5);
}

#[test]
fn test_dry_run_writes_nothing() {
    let (_dir, mut config) = setup("");
    config.dry_run = true;
    let prod = config.prod_dir.clone();

    let mut manager = BlocklistManager::new(config).unwrap();
    let summary = manager.run().unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.successful, 0);
    assert!(!prod.exists());
}

#[test]
fn test_skip_optimize() {
    let (_dir, mut config) = setup("google.com\n");
    config.skip_optimize = true;
    let prod = config.prod_dir.clone();

    let mut manager = BlocklistManager::new(config).unwrap();
    let summary = manager.run().unwrap();

    assert_eq!(summary.unique_domains, 5);
    assert_eq!(summary.final_count, 5);
    assert!(!prod.join("all_domains.txt").exists());
}

#[test]
fn test_missing_config_is_error() {
    let (_dir, mut config) = setup("");
    config.config_file = config.base_dir.join("does-not-exist.conf");

    let mut manager = BlocklistManager::new(config).unwrap();
    assert!(manager.run().is_err());
}
