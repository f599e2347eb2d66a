//! Serialization of domain sets into Pi-hole compatible list files.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::domain::DomainSet;
use crate::error::Result;

/// Domains in lexicographic order.
pub fn sorted_domains(domains: &DomainSet) -> Vec<&str> {
    let mut sorted: Vec<&str> = domains.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted
}

/// Current local time in the format used by list headers and reports.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render a domain set as a hosts-style blocklist.
///
/// # Example
/// ```
/// use blocklist_optimizer::{output::render_blocklist, DomainSet};
///
/// let domains: DomainSet = ["b.com", "a.com"].into_iter().map(String::from).collect();
/// let text = render_blocklist(&domains, "Master", "2024-01-01 00:00:00");
/// assert!(text.ends_with("0.0.0.0 a.com\n0.0.0.0 b.com\n"));
/// ```
pub fn render_blocklist(domains: &DomainSet, label: &str, generated_at: &str) -> String {
    let sorted = sorted_domains(domains);
    let mut out = String::with_capacity(128 + sorted.len() * 32);

    // Writing into a String cannot fail
    let _ = writeln!(out, "# Pi-hole {} Blocklist", label);
    let _ = writeln!(out, "# Last updated: {}", generated_at);
    let _ = writeln!(out, "# Total domains: {}", sorted.len());
    out.push('\n');

    for domain in sorted {
        out.push_str("0.0.0.0 ");
        out.push_str(domain);
        out.push('\n');
    }

    out
}

/// Write a domain set to `path` with a header stamped with the current time.
pub fn write_blocklist(path: &Path, domains: &DomainSet, label: &str) -> Result<()> {
    fs::write(path, render_blocklist(domains, label, &timestamp()))?;
    Ok(())
}

/// Format a count with thousands separators (`1622550` -> `1,622,550`).
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Uppercase the first character (`ads` -> `Ads`).
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
