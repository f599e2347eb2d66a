//! blocklist-optimizer: download, merge and whitelist-filter Pi-hole blocklists.

use blocklist_optimizer::output::format_count;
use blocklist_optimizer::{BlocklistManager, OptimizerConfig, RunSummary};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blocklist-optimizer")]
#[command(author = "Kaitu.io")]
#[command(version)]
#[command(about = "Downloads, optimizes, and organizes Pi-hole blocklists", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "blocklists.conf")]
    config: PathBuf,

    /// Whitelist file path
    #[arg(short, long, default_value = "whitelist.txt")]
    whitelist: PathBuf,

    /// Download progress file path
    #[arg(long, default_value = "download_progress.json")]
    progress_file: PathBuf,

    /// Base output directory for individual lists
    #[arg(short, long, default_value = "pihole_blocklists")]
    base_dir: PathBuf,

    /// Production output directory for combined lists
    #[arg(short, long, default_value = "pihole_blocklists_prod")]
    prod_dir: PathBuf,

    /// Number of concurrent downloads (1-16)
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Skip downloading (use existing local files)
    #[arg(long)]
    skip_download: bool,

    /// Skip creating production lists
    #[arg(long)]
    skip_optimize: bool,

    /// Disable incremental updates (force full re-download)
    #[arg(long)]
    no_incremental: bool,

    /// Show what would happen without doing it
    #[arg(long)]
    dry_run: bool,

    /// Disable subdomain matching in whitelist
    #[arg(long)]
    no_whitelist_subdomain: bool,

    /// Generate detailed whitelist match report
    #[arg(long)]
    whitelist_report: bool,

    /// Category left out of the master list (repeatable)
    #[arg(long = "exclude-category", default_values_t = ["nsfw".to_string()])]
    exclude_categories: Vec<String>,

    /// Verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    fn into_config(self) -> OptimizerConfig {
        // The bar would interleave with debug output
        let show_progress = !self.quiet && !self.verbose;
        OptimizerConfig {
            config_file: self.config,
            whitelist_file: self.whitelist,
            progress_file: self.progress_file,
            base_dir: self.base_dir,
            prod_dir: self.prod_dir,
            threads: self.threads,
            timeout: self.timeout,
            skip_download: self.skip_download,
            skip_optimize: self.skip_optimize,
            incremental: !self.no_incremental,
            dry_run: self.dry_run,
            whitelist_subdomain: !self.no_whitelist_subdomain,
            whitelist_report: self.whitelist_report,
            excluded_categories: self.exclude_categories.into_iter().collect::<BTreeSet<_>>(),
            show_progress,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp_secs()
        .init();

    let quiet = cli.quiet;
    if !quiet {
        print_banner();
    }

    let mut manager = match BlocklistManager::new(cli.into_config()) {
        Ok(manager) => manager,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    match manager.run() {
        Ok(summary) => {
            if !quiet && !manager.config().dry_run {
                print_summary(&summary, manager.config());
            }
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", "=".repeat(60));
    println!("{:>35}", "PI-HOLE BLOCKLIST OPTIMIZER");
    println!("{}", "=".repeat(60));
    println!();
}

fn print_summary(summary: &RunSummary, config: &OptimizerConfig) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{:>35}", "SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total blocklists:      {}", summary.total);
    println!("Successful:            {}", summary.successful);
    println!("Not modified:          {}", summary.skipped);
    println!("Failed:                {}", summary.failed);
    println!("Unique domains:        {}", format_count(summary.unique_domains));
    println!("Whitelisted:           {}", format_count(summary.whitelisted));
    println!("Final domain count:    {}", format_count(summary.final_count));
    println!("Time taken:            {:.2}s", summary.elapsed.as_secs_f64());

    if !summary.categories.is_empty() {
        println!();
        println!("Categories:");
        for (category, stats) in &summary.categories {
            println!(
                "  {:<20} {:>4} lists  {:>12} domains",
                category,
                stats.lists,
                format_count(stats.domains)
            );
        }
    }

    if !summary.failed_sources.is_empty() {
        println!();
        println!("Failed blocklists:");
        for failed in &summary.failed_sources {
            println!("  {} ({}): {}", failed.source.name, failed.source.category, failed.error);
            println!("    {}", failed.source.url);
        }
    }

    println!();
    println!("Individual lists:      {:?}", config.base_dir);
    println!("Production lists:      {:?}", config.prod_dir);
    println!("{}", "=".repeat(60));
}
