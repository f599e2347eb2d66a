//! Domain validation and canonicalization.
//!
//! A canonical domain is lowercase, carries no trailing dot, is at most 253
//! characters long and follows the DNS label grammar with at least two labels.
//! The final label must be at least two characters, so `a.b` is rejected.
//! A leading `*.` wildcard label is allowed and is not itself checked against
//! the label grammar.

use ahash::AHashSet;
use once_cell::sync::Lazy;
use quick_cache::sync::Cache;
use regex::Regex;

/// A deduplicated set of canonical domains.
pub type DomainSet = AHashSet<String>;

/// Maximum length of a domain name in characters.
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Default capacity of the validation cache (number of entries).
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Labels of 1-63 alphanumeric/hyphen characters, no leading or trailing
/// hyphen, at least two labels, final label of 2-63 characters.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z0-9][a-zA-Z0-9-]{0,61}[a-zA-Z0-9]$",
    )
    .expect("domain grammar regex is valid")
});

/// Canonicalize a domain: lowercase it and drop trailing dots.
///
/// Idempotent: normalizing an already-normalized domain returns it unchanged.
pub fn normalize_domain(domain: &str) -> String {
    domain.to_lowercase().trim_end_matches('.').to_string()
}

/// Check whether a string is an acceptable domain.
///
/// Rejects empty strings, `localhost`, anything under `.local`, names longer
/// than [`MAX_DOMAIN_LENGTH`] and names failing the label grammar.
///
/// # Example
/// ```
/// use blocklist_optimizer::domain::validate_domain;
///
/// assert!(validate_domain("ads.example.com"));
/// assert!(validate_domain("*.example.com"));
/// assert!(!validate_domain("printer.local"));
/// assert!(!validate_domain("-bad.com"));
/// ```
pub fn validate_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.eq_ignore_ascii_case("localhost") || has_local_suffix(domain) {
        return false;
    }
    if domain.len() > MAX_DOMAIN_LENGTH {
        return false;
    }
    let check = domain.strip_prefix("*.").unwrap_or(domain);
    DOMAIN_PATTERN.is_match(check)
}

/// `.local` is reserved for mDNS and never blocked.
fn has_local_suffix(domain: &str) -> bool {
    const SUFFIX: &str = ".local";
    domain.len() >= SUFFIX.len()
        && domain.is_char_boundary(domain.len() - SUFFIX.len())
        && domain[domain.len() - SUFFIX.len()..].eq_ignore_ascii_case(SUFFIX)
}

/// Configuration for the validation cache of a [`DomainNormalizer`].
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Maximum number of entries in the cache.
    pub cache_capacity: usize,
    /// Whether to enable caching.
    pub cache_enabled: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_enabled: true,
        }
    }
}

impl NormalizerConfig {
    /// Create a new configuration with the specified cache capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache_capacity: capacity,
            cache_enabled: true,
        }
    }

    /// Create a configuration with caching disabled.
    pub fn no_cache() -> Self {
        Self {
            cache_capacity: 0,
            cache_enabled: false,
        }
    }
}

/// Validation cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Configured capacity
    pub capacity: usize,
    /// Entries currently held
    pub len: usize,
    /// Whether the cache is active
    pub enabled: bool,
}

/// Validates and canonicalizes domains, memoizing validation results.
///
/// The same names show up across many blocklists, so validity is cached in a
/// bounded cache owned by the normalizer. The cache is invisible to callers:
/// cached and uncached normalizers give identical answers.
///
/// # Example
/// ```
/// use blocklist_optimizer::DomainNormalizer;
///
/// let normalizer = DomainNormalizer::new();
/// assert_eq!(normalizer.canonicalize("Ads.Example.COM."), Some("ads.example.com".to_string()));
/// assert_eq!(normalizer.canonicalize("localhost"), None);
/// ```
pub struct DomainNormalizer {
    cache: Option<Cache<String, bool>>,
    config: NormalizerConfig,
}

impl DomainNormalizer {
    /// Create a normalizer with the default cache configuration.
    pub fn new() -> Self {
        Self::with_config(NormalizerConfig::default())
    }

    /// Create a normalizer with a custom cache configuration.
    pub fn with_config(config: NormalizerConfig) -> Self {
        let cache = if config.cache_enabled && config.cache_capacity > 0 {
            Some(Cache::new(config.cache_capacity))
        } else {
            None
        };
        Self { cache, config }
    }

    /// Canonicalize a raw domain string. See [`normalize_domain`].
    pub fn normalize(&self, raw: &str) -> String {
        normalize_domain(raw)
    }

    /// Check domain validity, consulting the cache first.
    pub fn is_valid(&self, domain: &str) -> bool {
        let Some(ref cache) = self.cache else {
            return validate_domain(domain);
        };

        if let Some(valid) = cache.get(domain) {
            return valid;
        }

        let valid = validate_domain(domain);
        cache.insert(domain.to_string(), valid);
        valid
    }

    /// Normalize then validate, returning the canonical form if it is valid.
    pub fn canonicalize(&self, raw: &str) -> Option<String> {
        let domain = self.normalize(raw);
        self.is_valid(&domain).then_some(domain)
    }

    /// Drop all cached validation results.
    pub fn clear_cache(&self) {
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        match self.cache {
            Some(ref cache) => CacheStats {
                capacity: self.config.cache_capacity,
                len: cache.len(),
                enabled: true,
            },
            None => CacheStats {
                capacity: 0,
                len: 0,
                enabled: false,
            },
        }
    }
}

impl Default for DomainNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("example.com"));
        assert!(validate_domain("sub.example.com"));
        assert!(validate_domain("a.b.c.d.example.com"));
        assert!(validate_domain("xn--bcher-kva.example"));
        assert!(!validate_domain("localhost"));
        assert!(!validate_domain("test.local"));
        assert!(!validate_domain("TEST.LOCAL"));
        assert!(!validate_domain(""));
        assert!(!validate_domain("-invalid.com"));
        assert!(!validate_domain("invalid-.com"));
        assert!(!validate_domain("com"));
        assert!(!validate_domain("bad_label.com"));
        assert!(!validate_domain("double..dot.com"));
    }

    #[test]
    fn test_validate_wildcard_prefix() {
        assert!(validate_domain("*.example.com"));
        assert!(!validate_domain("*.local"));
        assert!(!validate_domain("*.com"));
        assert!(!validate_domain("a*.example.com"));
    }

    #[test]
    fn test_validate_length_limit() {
        let label = "a".repeat(63);
        let long = format!("{label}.{label}.{label}.{label}.com");
        assert!(long.len() > MAX_DOMAIN_LENGTH);
        assert!(!validate_domain(&long));

        let max = format!("{label}.{label}.{label}.{}.com", "b".repeat(57));
        assert_eq!(max.len(), MAX_DOMAIN_LENGTH);
        assert!(validate_domain(&max));

        let too_long_label = format!("{}.com", "a".repeat(64));
        assert!(!validate_domain(&too_long_label));
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("Example.COM"), "example.com");
        assert_eq!(normalize_domain("test.com."), "test.com");
        assert_eq!(normalize_domain("test.com.."), "test.com");
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["Example.COM.", "a.b..", "*.Ads.Net", "", ".", "MiXeD.case.ORG"] {
            let once = normalize_domain(raw);
            assert_eq!(normalize_domain(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn test_normalize_preserves_validity() {
        for raw in ["Example.COM", "Sub.Example.Org", "*.CDN.net", "X.io"] {
            assert!(validate_domain(raw), "input {raw:?}");
            assert!(validate_domain(&normalize_domain(raw)), "input {raw:?}");
        }
        assert!(!validate_domain("Test.LOCAL"));
        assert!(!validate_domain(&normalize_domain("Test.LOCAL")));
    }

    #[test]
    fn test_final_label_needs_two_characters() {
        assert!(!validate_domain("a.b"));
        assert!(!validate_domain("example.c"));
        assert!(validate_domain("a.bc"));
        assert!(validate_domain("x.example.io"));
    }

    #[test]
    fn test_normalizer_cache() {
        let normalizer = DomainNormalizer::new();
        assert!(normalizer.is_valid("example.com"));
        assert!(normalizer.is_valid("example.com"));
        assert!(!normalizer.is_valid("localhost"));

        let stats = normalizer.cache_stats();
        assert!(stats.enabled);
        assert_eq!(stats.capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(stats.len, 2);

        let small = DomainNormalizer::with_config(NormalizerConfig::with_capacity(100));
        assert_eq!(small.cache_stats().capacity, 100);

        normalizer.clear_cache();
        assert_eq!(normalizer.cache_stats().len, 0);
    }

    #[test]
    fn test_normalizer_without_cache() {
        let normalizer = DomainNormalizer::with_config(NormalizerConfig::no_cache());
        assert!(normalizer.is_valid("example.com"));
        assert!(!normalizer.cache_stats().enabled);
        assert_eq!(normalizer.cache_stats().len, 0);
    }

    #[test]
    fn test_canonicalize() {
        let normalizer = DomainNormalizer::new();
        assert_eq!(
            normalizer.canonicalize("Tracker.Example.NET."),
            Some("tracker.example.net".to_string())
        );
        assert_eq!(normalizer.canonicalize("printer.LOCAL"), None);
        assert_eq!(normalizer.canonicalize("not a domain"), None);
    }
}
