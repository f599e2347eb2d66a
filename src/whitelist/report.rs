//! Plain-text whitelist match report.

use std::fmt;

use super::pattern::WhitelistEntry;

/// Default number of example domains listed per entry.
const DEFAULT_MAX_EXAMPLES: usize = 50;

/// Options for rendering a whitelist report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Example domains listed per entry before truncating
    pub max_examples: usize,
    /// Timestamp line; omitted when `None`
    pub generated_at: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_examples: DEFAULT_MAX_EXAMPLES,
            generated_at: None,
        }
    }
}

/// Renders entry match lists into a human-readable report.
///
/// Entries are listed by descending match count; ties keep declaration
/// order. Entries without matches are left out.
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a formatter.
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Render `entries` (declaration order) into report text.
    pub fn format(&self, entries: &[WhitelistEntry]) -> String {
        WhitelistReport {
            entries,
            options: &self.options,
        }
        .to_string()
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

struct WhitelistReport<'a> {
    entries: &'a [WhitelistEntry],
    options: &'a ReportOptions,
}

impl fmt::Display for WhitelistReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&WhitelistEntry> = self.entries.iter().collect();
        // Stable sort keeps declaration order on ties
        sorted.sort_by(|a, b| b.match_count().cmp(&a.match_count()));

        writeln!(f, "Whitelist Report")?;
        writeln!(f, "{}", "=".repeat(80))?;
        writeln!(f)?;
        if let Some(ref generated) = self.options.generated_at {
            writeln!(f, "Generated: {}", generated)?;
            writeln!(f)?;
        }

        let total: usize = sorted.iter().map(|e| e.match_count()).sum();
        writeln!(f, "Total Domains Removed: {}", total)?;
        writeln!(f)?;

        for entry in sorted.iter().filter(|e| e.match_count() > 0) {
            writeln!(f, "Pattern: {} ({})", entry.pattern(), entry.kind())?;
            writeln!(f, "Matches: {}", entry.match_count())?;
            for domain in entry.matches().iter().take(self.options.max_examples) {
                writeln!(f, "  - {}", domain)?;
            }
            if entry.match_count() > self.options.max_examples {
                writeln!(
                    f,
                    "  ... and {} more",
                    entry.match_count() - self.options.max_examples
                )?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Render a report with the given options.
pub fn format_report(entries: &[WhitelistEntry], options: &ReportOptions) -> String {
    ReportFormatter::new(options.clone()).format(entries)
}
