//! Whitelist text parsing and pattern compilation.

use ahash::AHashMap;
use regex::Regex;
use std::io::ErrorKind;
use std::path::Path;

use super::pattern::{PatternKind, WhitelistEntry};
use crate::domain::DomainNormalizer;

/// Per-kind counts of a loaded whitelist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitelistStats {
    /// Exact domain entries
    pub exact: usize,
    /// Wildcard entries
    pub wildcard: usize,
    /// Regex entries
    pub regex: usize,
    /// Wildcard or regex lines that failed to compile
    pub invalid: usize,
}

impl WhitelistStats {
    /// Total number of usable entries.
    pub fn total(&self) -> usize {
        self.exact + self.wildcard + self.regex
    }
}

/// A compiled whitelist.
///
/// Entries are kept in declaration order, which is the tie-break used when
/// several patterns could be credited with the same removal.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    pub(crate) entries: Vec<WhitelistEntry>,
    /// Raw pattern text -> entry index
    index: AHashMap<String, usize>,
    /// Canonical exact domain -> entry index
    pub(crate) exact: AHashMap<String, usize>,
    /// Wildcard entry indices, declaration order
    pub(crate) wildcards: Vec<usize>,
    /// Regex entry indices, declaration order
    pub(crate) regexes: Vec<usize>,
    /// Alternation of every wildcard and regex entry
    pub(crate) combined: Option<Regex>,
    stats: WhitelistStats,
}

impl Whitelist {
    /// Create an empty whitelist that removes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile whitelist text with a default compiler.
    ///
    /// # Example
    /// ```
    /// use blocklist_optimizer::{PatternKind, Whitelist};
    ///
    /// let whitelist = Whitelist::parse("example.com\n*.cdn.net  # assets\n/^t\\d+\\.io$/\n");
    /// assert_eq!(whitelist.len(), 3);
    /// assert_eq!(whitelist.get("*.cdn.net").unwrap().kind(), PatternKind::Wildcard);
    /// ```
    pub fn parse(text: &str) -> Self {
        PatternCompiler::new().load(text)
    }

    /// Load a whitelist file.
    ///
    /// A missing file yields an empty whitelist. Read failures are logged and
    /// also yield an empty whitelist.
    pub fn load_file(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::parse(&String::from_utf8_lossy(&bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Whitelist file not found: {:?}", path);
                Self::empty()
            }
            Err(e) => {
                log::error!("Failed to load whitelist {:?}: {}", path, e);
                Self::empty()
            }
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the whitelist has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }

    /// Entries of a given kind, declaration order.
    pub fn entries_of_kind(&self, kind: PatternKind) -> impl Iterator<Item = &WhitelistEntry> {
        self.entries.iter().filter(move |e| e.kind() == kind)
    }

    /// Look up an entry by its raw pattern text (canonical domain for exact entries).
    pub fn get(&self, pattern: &str) -> Option<&WhitelistEntry> {
        self.index.get(pattern).map(|&idx| &self.entries[idx])
    }

    /// Check whether a canonical domain is an exact entry.
    pub fn contains_exact(&self, domain: &str) -> bool {
        self.exact.contains_key(domain)
    }

    /// Number of wildcard and regex entries.
    pub fn pattern_count(&self) -> usize {
        self.wildcards.len() + self.regexes.len()
    }

    /// Whether the combined matcher is available.
    ///
    /// `false` with a non-zero [`pattern_count`](Self::pattern_count) means the
    /// alternation failed to compile and patterns are checked one by one.
    pub fn has_combined_matcher(&self) -> bool {
        self.combined.is_some()
    }

    /// Per-kind counts.
    pub fn stats(&self) -> WhitelistStats {
        self.stats
    }

    fn push(&mut self, key: String, entry: WhitelistEntry) -> Option<usize> {
        if self.index.contains_key(&key) {
            log::debug!("Duplicate whitelist entry ignored: {}", key);
            return None;
        }
        let idx = self.entries.len();
        self.index.insert(key, idx);
        self.entries.push(entry);
        Some(idx)
    }

    fn build_combined(&mut self) {
        if self.pattern_count() == 0 {
            return;
        }

        let alternation = self
            .wildcards
            .iter()
            .chain(self.regexes.iter())
            .filter_map(|&idx| self.entries[idx].matcher())
            .map(|re| format!("(?:{})", re.as_str()))
            .collect::<Vec<_>>()
            .join("|");

        match Regex::new(&alternation) {
            Ok(re) => self.combined = Some(re),
            Err(e) => {
                log::warn!(
                    "Failed to compile combined whitelist pattern, falling back to individual checks: {}",
                    e
                );
                self.combined = None;
            }
        }
    }
}

/// Parses whitelist text into a [`Whitelist`].
///
/// # Line format
/// - `#` starts a comment running to the end of the line
/// - `/pattern/` is a regex, compiled as-is
/// - Any other line containing `*` is a wildcard
/// - Everything else is an exact domain, normalized and validated; invalid
///   domains are skipped without a warning
///
/// Patterns that fail to compile are logged and skipped. Loading never fails.
pub struct PatternCompiler {
    normalizer: DomainNormalizer,
}

impl PatternCompiler {
    /// Create a compiler with a default normalizer.
    pub fn new() -> Self {
        Self::with_normalizer(DomainNormalizer::new())
    }

    /// Create a compiler around an existing normalizer.
    pub fn with_normalizer(normalizer: DomainNormalizer) -> Self {
        Self { normalizer }
    }

    /// Compile whitelist text.
    pub fn load(&self, text: &str) -> Whitelist {
        let mut whitelist = Whitelist::empty();

        for (line_num, line) in text.lines().enumerate() {
            // Remove comments
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            if line.len() > 2 && line.starts_with('/') && line.ends_with('/') {
                match WhitelistEntry::regex(line) {
                    Ok(entry) => {
                        if let Some(idx) = whitelist.push(line.to_string(), entry) {
                            whitelist.regexes.push(idx);
                            whitelist.stats.regex += 1;
                        }
                    }
                    Err(e) => {
                        log::warn!("Skipping line {}: {}", line_num + 1, e.with_pattern(line));
                        whitelist.stats.invalid += 1;
                    }
                }
                continue;
            }

            if line.contains('*') {
                match WhitelistEntry::wildcard(line) {
                    Ok(entry) => {
                        if let Some(idx) = whitelist.push(line.to_string(), entry) {
                            whitelist.wildcards.push(idx);
                            whitelist.stats.wildcard += 1;
                        }
                    }
                    Err(e) => {
                        log::warn!("Skipping line {}: {}", line_num + 1, e.with_pattern(line));
                        whitelist.stats.invalid += 1;
                    }
                }
                continue;
            }

            if let Some(domain) = self.normalizer.canonicalize(line) {
                let entry = WhitelistEntry::exact(domain.clone());
                if let Some(idx) = whitelist.push(domain.clone(), entry) {
                    whitelist.exact.insert(domain, idx);
                    whitelist.stats.exact += 1;
                }
            }
        }

        whitelist.build_combined();

        let stats = whitelist.stats;
        if stats.total() > 0 {
            log::info!(
                "Loaded {} whitelist entries: {} exact, {} wildcard, {} regex",
                stats.total(),
                stats.exact,
                stats.wildcard,
                stats.regex
            );
        }

        whitelist
    }
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        let text = r#"
# Whitelist
example.com
Sub.Example.ORG.      # trailing dot and case
*.cdn.net
/^t\d+\.io$/
not_a_domain
"#;
        let whitelist = Whitelist::parse(text);
        let stats = whitelist.stats();

        assert_eq!(stats.exact, 2);
        assert_eq!(stats.wildcard, 1);
        assert_eq!(stats.regex, 1);
        assert_eq!(stats.invalid, 0);
        assert_eq!(whitelist.len(), 4);

        assert!(whitelist.contains_exact("example.com"));
        assert!(whitelist.contains_exact("sub.example.org"));
        assert!(!whitelist.contains_exact("not_a_domain"));
        assert_eq!(whitelist.get(r"/^t\d+\.io$/").unwrap().kind(), PatternKind::Regex);
        assert!(whitelist.has_combined_matcher());
    }

    #[test]
    fn test_declaration_order_preserved() {
        let whitelist = Whitelist::parse("/b/\n*.a.com\nz.com\n/a/\n*.b.com\n");
        let patterns: Vec<&str> = whitelist.entries().iter().map(|e| e.pattern()).collect();
        assert_eq!(patterns, vec!["/b/", "*.a.com", "z.com", "/a/", "*.b.com"]);

        let wildcards: Vec<&str> = whitelist
            .entries_of_kind(PatternKind::Wildcard)
            .map(|e| e.pattern())
            .collect();
        assert_eq!(wildcards, vec!["*.a.com", "*.b.com"]);
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let whitelist = Whitelist::parse("/([bad/\n*(.example.com\ngood.com\n");
        let stats = whitelist.stats();
        assert_eq!(stats.invalid, 2);
        assert_eq!(stats.exact, 1);
        assert_eq!(whitelist.pattern_count(), 0);
        assert!(!whitelist.has_combined_matcher());
    }

    #[test]
    fn test_duplicates_collapse() {
        let whitelist = Whitelist::parse("example.com\nEXAMPLE.com\n*.cdn.net\n*.cdn.net\n");
        assert_eq!(whitelist.len(), 2);
        assert_eq!(whitelist.stats().exact, 1);
        assert_eq!(whitelist.stats().wildcard, 1);
    }

    #[test]
    fn test_comment_truncation() {
        let whitelist = Whitelist::parse("# only a comment\n   \nkeep.com#note\n");
        assert_eq!(whitelist.len(), 1);
        assert!(whitelist.contains_exact("keep.com"));
    }

    #[test]
    fn test_slash_edge_cases() {
        // "//" is too short to be a regex and is not a valid domain either
        let whitelist = Whitelist::parse("//\n/\n");
        assert!(whitelist.is_empty());
    }

    #[test]
    fn test_empty_whitelist() {
        let whitelist = Whitelist::parse("");
        assert!(whitelist.is_empty());
        assert!(!whitelist.has_combined_matcher());
        assert_eq!(whitelist.stats().total(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let whitelist = Whitelist::load_file(Path::new("/nonexistent/whitelist.txt"));
        assert!(whitelist.is_empty());
    }
}
