//! Whitelist compilation, filtering and reporting.
//!
//! A whitelist file lists domains that must never be blocked:
//!
//! ```text
//! # exact domain, also covers subdomains when subdomain matching is on
//! example.com
//! # wildcard, anchored to the whole domain
//! *.cdn.example.net
//! # regex, used as written
//! /^track\d+\.example\.org$/
//! ```
//!
//! [`PatternCompiler`] turns that text into a [`Whitelist`], [`FilterEngine`]
//! removes matching domains from a set while crediting each removal to one
//! entry, and [`ReportFormatter`] renders the credits.

mod compiler;
mod filter;
mod pattern;
mod report;

pub use compiler::{PatternCompiler, Whitelist, WhitelistStats};
pub use filter::{FilterEngine, FilterOptions, MatchStrategy, Removal};
pub use pattern::{wildcard_to_regex, PatternKind, WhitelistEntry};
pub use report::{format_report, ReportFormatter, ReportOptions};
