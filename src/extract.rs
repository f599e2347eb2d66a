//! Domain extraction from raw blocklist lines.
//!
//! Blocklists come in three line conventions which are auto-detected per line:
//! - Hosts: `0.0.0.0 ads.example.com`
//! - Adblock: `||ads.example.com^` or `||ads.example.com^$third-party`
//! - Plain: `ads.example.com`
//!
//! Anything else (headers, cosmetic filters, URLs) is dropped silently.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{DomainNormalizer, DomainSet};

/// Leading IPv4 dotted quad, whitespace, then exactly one token.
static HOSTS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\s+(\S+)$").expect("hosts regex is valid")
});

/// `||domain^` with an optional `$modifiers` suffix.
static ADBLOCK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|\|(.+?)\^(?:\$.*)?$").expect("adblock regex is valid"));

/// Line convention a candidate domain was recognized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineFormat {
    /// `<ipv4> <domain>`
    Hosts,
    /// `||<domain>^[$modifiers]`
    Adblock,
    /// Bare token without whitespace, `/` or `?`
    Plain,
}

impl LineFormat {
    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineFormat::Hosts => "hosts",
            LineFormat::Adblock => "adblock",
            LineFormat::Plain => "plain",
        }
    }
}

/// Extract a candidate domain from a single line.
///
/// The candidate is neither normalized nor validated.
///
/// # Example
/// ```
/// use blocklist_optimizer::extract::extract_domain;
///
/// assert_eq!(extract_domain("0.0.0.0 ads.example.com"), Some("ads.example.com"));
/// assert_eq!(extract_domain("||tracker.net^$third-party"), Some("tracker.net"));
/// assert_eq!(extract_domain("# comment"), None);
/// ```
pub fn extract_domain(line: &str) -> Option<&str> {
    extract_with_format(line).map(|(_, domain)| domain)
}

/// Extract a candidate domain along with the recognizer that accepted it.
pub fn extract_with_format(line: &str) -> Option<(LineFormat, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    // Inline comment
    let line = match line.find(|c: char| c == '#' || c == '!') {
        Some(idx) => line[..idx].trim(),
        None => line,
    };
    if line.is_empty() {
        return None;
    }

    if let Some(caps) = HOSTS_LINE.captures(line) {
        return caps.get(1).map(|m| (LineFormat::Hosts, m.as_str()));
    }

    if let Some(caps) = ADBLOCK_LINE.captures(line) {
        return caps.get(1).map(|m| (LineFormat::Adblock, m.as_str()));
    }

    if !line.contains(char::is_whitespace) && !line.contains('/') && !line.contains('?') {
        return Some((LineFormat::Plain, line));
    }

    None
}

/// Turns raw blocklist content into a deduplicated set of canonical domains.
pub struct DomainExtractor {
    normalizer: DomainNormalizer,
}

impl DomainExtractor {
    /// Create an extractor with a default [`DomainNormalizer`].
    pub fn new() -> Self {
        Self::with_normalizer(DomainNormalizer::new())
    }

    /// Create an extractor around an existing normalizer.
    pub fn with_normalizer(normalizer: DomainNormalizer) -> Self {
        Self { normalizer }
    }

    /// Access the underlying normalizer.
    pub fn normalizer(&self) -> &DomainNormalizer {
        &self.normalizer
    }

    /// Extract every valid domain from raw bytes.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn extract_domains(&self, content: &[u8]) -> DomainSet {
        let text = String::from_utf8_lossy(content);
        let mut domains = DomainSet::default();
        self.extend_from_text(&text, &mut domains);
        domains
    }

    /// Extract every valid domain from `text` into an existing set.
    ///
    /// Returns the number of lines that produced a valid domain, duplicates
    /// included.
    pub fn extend_from_text(&self, text: &str, domains: &mut DomainSet) -> usize {
        let mut accepted = 0usize;
        let mut rejected = 0usize;

        for line in text.lines() {
            let Some(candidate) = extract_domain(line) else {
                continue;
            };
            match self.normalizer.canonicalize(candidate) {
                Some(domain) => {
                    domains.insert(domain);
                    accepted += 1;
                }
                None => rejected += 1,
            }
        }

        log::debug!(
            "Extracted {} domains ({} candidates rejected, {} unique in set)",
            accepted,
            rejected,
            domains.len()
        );
        accepted
    }
}

impl Default for DomainExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a domain set from raw bytes with a throwaway extractor.
pub fn parse_blocklist(content: &[u8]) -> DomainSet {
    DomainExtractor::new().extract_domains(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hosts() {
        assert_eq!(
            extract_with_format("0.0.0.0 ads.example.com"),
            Some((LineFormat::Hosts, "ads.example.com"))
        );
        assert_eq!(extract_domain("127.0.0.1 tracker.com"), Some("tracker.com"));
        assert_eq!(extract_domain("  0.0.0.0\tspaced.example.com  "), Some("spaced.example.com"));
    }

    #[test]
    fn test_extract_hosts_multiple_tokens() {
        // Only single-token hosts lines are recognized
        assert_eq!(extract_domain("0.0.0.0 a.example.com b.example.com"), None);
    }

    #[test]
    fn test_extract_adblock() {
        assert_eq!(
            extract_with_format("||ads.example.com^"),
            Some((LineFormat::Adblock, "ads.example.com"))
        );
        assert_eq!(extract_domain("||tracker.com^$third-party"), Some("tracker.com"));

        // Without the closing `^` the line falls through to the plain shape
        // and is dropped by validation
        assert_eq!(
            extract_with_format("||tracker.com"),
            Some((LineFormat::Plain, "||tracker.com"))
        );
        assert!(parse_blocklist(b"||tracker.com\n").is_empty());
    }

    #[test]
    fn test_extract_plain() {
        assert_eq!(
            extract_with_format("ads.example.com"),
            Some((LineFormat::Plain, "ads.example.com"))
        );
        assert_eq!(extract_domain("https://example.com/path"), None);
        assert_eq!(extract_domain("example.com?x=1"), None);
        assert_eq!(extract_domain("not a domain"), None);
    }

    #[test]
    fn test_extract_comments() {
        assert_eq!(extract_domain("# comment"), None);
        assert_eq!(extract_domain("! comment"), None);
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("   "), None);
        assert_eq!(
            extract_domain("ads.example.com # inline comment"),
            Some("ads.example.com")
        );
        assert_eq!(
            extract_domain("0.0.0.0 ads.example.com #blocked"),
            Some("ads.example.com")
        );
    }

    #[test]
    fn test_extract_unvalidated_candidate() {
        // The extractor only recognizes shape; validation happens later
        assert_eq!(extract_domain("not-a-domain"), Some("not-a-domain"));
        assert_eq!(extract_domain("0.0.0.0 localhost"), Some("localhost"));
    }

    #[test]
    fn test_extract_domains_end_to_end() {
        let content = b"0.0.0.0 ads.example.com\n||tracker.example.net^\nplainsite.org\n# comment\nnot a domain!!\n";
        let domains = parse_blocklist(content);

        let mut sorted: Vec<&str> = domains.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        assert_eq!(
            sorted,
            vec!["ads.example.com", "plainsite.org", "tracker.example.net"]
        );
    }

    #[test]
    fn test_extract_domains_dedup_and_normalize() {
        let content = b"Ads.Example.COM\n0.0.0.0 ads.example.com\n||ADS.example.com.^\n0.0.0.0 localhost\nprinter.local\n";
        let domains = parse_blocklist(content);
        assert_eq!(domains.len(), 1);
        assert!(domains.contains("ads.example.com"));
    }

    #[test]
    fn test_extract_domains_invalid_utf8() {
        let mut content = b"good.example.com\n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b'\n']);
        content.extend_from_slice(b"other.example.org\n");

        let domains = parse_blocklist(&content);
        assert_eq!(domains.len(), 2);
        assert!(domains.contains("good.example.com"));
        assert!(domains.contains("other.example.org"));
    }

    #[test]
    fn test_extend_from_text_counts() {
        let extractor = DomainExtractor::new();
        let mut domains = DomainSet::default();
        let accepted = extractor.extend_from_text("a.example.com\na.example.com\nbad_one\n", &mut domains);
        assert_eq!(accepted, 2);
        assert_eq!(domains.len(), 1);
    }
}
