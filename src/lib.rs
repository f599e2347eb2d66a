//! Blocklist Optimizer - builds deduplicated, whitelist-filtered DNS blocklists.
//!
//! Many public blocklists overlap heavily and use different line formats
//! (hosts files, Adblock Plus rules, plain domain lists). This crate downloads
//! them, extracts and normalizes the domains, merges them per category and
//! removes everything matched by a user whitelist before writing Pi-hole
//! compatible lists.
//!
//! # Features
//!
//! - **Format detection**: hosts, `||domain^` adblock and plain lines
//! - **Domain validation**: RFC-style grammar check with a bounded result cache
//! - **Whitelist patterns**: exact domains, `*` wildcards and `/regex/` lines
//! - **Subdomain coverage**: an exact entry can also cover its subdomains
//! - **Provenance reports**: which whitelist pattern removed which domains
//! - **Incremental downloads**: ETag / Last-Modified conditional requests
//!
//! # Quick Start
//!
//! ```
//! use blocklist_optimizer::{DomainSet, FilterEngine, FilterOptions, PatternKind, Whitelist};
//!
//! let whitelist = Whitelist::parse("example.com\n*.cdn.net\n/^safe[0-9]+\\.org$/\n");
//! let mut engine = FilterEngine::new(whitelist, FilterOptions::default());
//!
//! let domains: DomainSet = ["example.com", "ads.example.com", "x.cdn.net", "safe1.org", "evil.com"]
//!     .into_iter()
//!     .map(String::from)
//!     .collect();
//!
//! let (kept, removed) = engine.filter(&domains, true);
//! assert_eq!(removed, 4);
//! assert!(kept.contains("evil.com"));
//!
//! let wildcard = engine.whitelist().entries_of_kind(PatternKind::Wildcard).next().unwrap();
//! assert_eq!(wildcard.matches(), ["x.cdn.net".to_string()]);
//! ```
//!
//! # Running a full update
//!
//! ```ignore
//! use blocklist_optimizer::{BlocklistManager, OptimizerConfig};
//!
//! let mut manager = BlocklistManager::new(OptimizerConfig::default())?;
//! let summary = manager.run()?;
//! println!("{} domains after filtering", summary.final_count);
//! ```
//!
//! # Whitelist Matching Order
//!
//! 1. Exact entries (and, with subdomain matching, the closest whitelisted parent)
//! 2. Wildcard patterns in declaration order
//! 3. Regex patterns in declaration order

mod error;

pub mod config;
pub mod domain;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod whitelist;

// Re-export core types
pub use error::{Error, PatternError, Result};

// Re-export domain handling
pub use domain::{DomainNormalizer, DomainSet, NormalizerConfig};
pub use extract::{DomainExtractor, LineFormat};

// Re-export whitelist types
pub use whitelist::{
    FilterEngine, FilterOptions, PatternCompiler, PatternKind, ReportFormatter, ReportOptions,
    Whitelist, WhitelistEntry,
};

// Re-export the update pipeline
pub use config::{BlocklistSource, OptimizerConfig};
pub use fetch::Fetcher;
pub use pipeline::{BlocklistManager, CategoryStats, FailedSource, RunSummary};
pub use progress::ProgressTracker;
