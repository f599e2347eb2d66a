//! Whitelist filtering with match provenance.

use ahash::AHashSet;

use super::compiler::Whitelist;
use super::pattern::{PatternKind, WhitelistEntry};
use crate::domain::DomainSet;

/// Options controlling which strategies the filter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Treat every exact entry as also covering its subdomains.
    pub subdomain_matching: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            subdomain_matching: true,
        }
    }
}

/// Strategy that caused a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// Domain is an exact entry
    Exact,
    /// A parent of the domain is an exact entry
    Subdomain,
    /// A wildcard entry matched
    Wildcard,
    /// A regex entry matched
    Regex,
}

impl MatchStrategy {
    fn for_pattern(kind: PatternKind) -> Self {
        match kind {
            PatternKind::Exact => MatchStrategy::Exact,
            PatternKind::Wildcard => MatchStrategy::Wildcard,
            PatternKind::Regex => MatchStrategy::Regex,
        }
    }
}

/// Explanation of why a single domain would be removed.
#[derive(Debug, Clone, Copy)]
pub struct Removal<'a> {
    /// Entry credited with the removal
    pub entry: &'a WhitelistEntry,
    /// Strategy that fired
    pub strategy: MatchStrategy,
}

/// A non-exact hit.
enum Hit {
    /// Credited to an entry
    Attributed(usize, MatchStrategy),
    /// Combined matcher fired and attribution was not requested
    Unattributed,
}

/// FilterEngine removes whitelisted domains from domain sets.
///
/// Strategies run in a fixed order for each domain:
/// 1. Exact membership (bulk, before per-domain iteration)
/// 2. Subdomain suffix, closest parent first
/// 3. Combined wildcard/regex matcher; attribution tries wildcards in
///    declaration order, then regexes in declaration order
///
/// With provenance tracking on, each removed domain is appended to the match
/// list of the entry credited with it. Match lists accumulate across calls
/// until [`clear_matches`](Self::clear_matches) is called. The engine is meant
/// for single-owner use; share it across threads only behind a lock.
///
/// # Example
/// ```
/// use blocklist_optimizer::{DomainSet, FilterEngine, FilterOptions, Whitelist};
///
/// let whitelist = Whitelist::parse("example.com\n*.cdn.net\n");
/// let mut engine = FilterEngine::new(whitelist, FilterOptions::default());
///
/// let domains: DomainSet = ["sub.example.com", "a.cdn.net", "keep.me"]
///     .into_iter()
///     .map(String::from)
///     .collect();
/// let (retained, removed) = engine.filter(&domains, true);
///
/// assert_eq!(removed, 2);
/// assert!(retained.contains("keep.me"));
/// assert_eq!(engine.total_matches(), 2);
/// ```
pub struct FilterEngine {
    whitelist: Whitelist,
    options: FilterOptions,
}

impl FilterEngine {
    /// Create an engine that owns `whitelist` for the rest of the run.
    pub fn new(whitelist: Whitelist, options: FilterOptions) -> Self {
        Self { whitelist, options }
    }

    /// The compiled whitelist.
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Active options.
    pub fn options(&self) -> FilterOptions {
        self.options
    }

    /// Entries in declaration order, with their match lists.
    pub fn entries(&self) -> &[WhitelistEntry] {
        self.whitelist.entries()
    }

    /// Sum of all match-list lengths.
    pub fn total_matches(&self) -> usize {
        self.whitelist.entries.iter().map(WhitelistEntry::match_count).sum()
    }

    /// Reset every match list.
    pub fn clear_matches(&mut self) {
        for entry in &mut self.whitelist.entries {
            entry.clear_matches();
        }
    }

    /// Filter a domain set.
    ///
    /// Returns the retained domains and the number removed. When
    /// `track_provenance` is set, every removal is credited to exactly one
    /// entry, so the match lists grow by exactly the removed count.
    pub fn filter(&mut self, domains: &DomainSet, track_provenance: bool) -> (DomainSet, usize) {
        if self.whitelist.is_empty() {
            return (domains.clone(), 0);
        }

        let mut exact_hits: Vec<(&str, usize)> = if self.whitelist.exact.len() <= domains.len() {
            self.whitelist
                .exact
                .iter()
                .filter_map(|(domain, &idx)| domains.get(domain.as_str()).map(|d| (d.as_str(), idx)))
                .collect()
        } else {
            domains
                .iter()
                .filter_map(|d| self.whitelist.exact.get(d.as_str()).map(|&idx| (d.as_str(), idx)))
                .collect()
        };
        let mut removed = exact_hits.len();

        if track_provenance {
            exact_hits.sort_unstable();
            for &(domain, idx) in &exact_hits {
                self.whitelist.entries[idx].record(domain);
            }
        }

        let hits: AHashSet<&str> = exact_hits.iter().map(|&(d, _)| d).collect();
        let has_patterns = self.whitelist.pattern_count() > 0;
        if !self.options.subdomain_matching && !has_patterns {
            let retained = domains
                .iter()
                .filter(|d| !hits.contains(d.as_str()))
                .cloned()
                .collect();
            if removed > 0 {
                log::info!("Filtered {} whitelisted domains", removed);
            }
            return (retained, removed);
        }

        let mut remaining: Vec<&String> = domains
            .iter()
            .filter(|d| !hits.contains(d.as_str()))
            .collect();
        // Sorted so match lists come out in a stable order
        if track_provenance {
            remaining.sort_unstable();
        }

        let mut retained = DomainSet::with_capacity(remaining.len());
        for domain in remaining {
            match self.match_non_exact(domain, track_provenance) {
                Some(hit) => {
                    removed += 1;
                    match hit {
                        Hit::Attributed(idx, _) if track_provenance => {
                            self.whitelist.entries[idx].record(domain);
                        }
                        _ => {}
                    }
                }
                None => {
                    retained.insert(domain.clone());
                }
            }
        }

        if removed > 0 {
            log::info!("Filtered {} whitelisted domains", removed);
        }

        (retained, removed)
    }

    /// Check whether a single canonical domain would be removed.
    pub fn is_whitelisted(&self, domain: &str) -> bool {
        self.whitelist.exact.contains_key(domain) || self.match_non_exact(domain, false).is_some()
    }

    /// Explain which entry would be credited with removing `domain`.
    ///
    /// Does not record anything.
    pub fn explain(&self, domain: &str) -> Option<Removal<'_>> {
        if let Some(&idx) = self.whitelist.exact.get(domain) {
            return Some(Removal {
                entry: &self.whitelist.entries[idx],
                strategy: MatchStrategy::Exact,
            });
        }

        match self.match_non_exact(domain, true)? {
            Hit::Attributed(idx, strategy) => Some(Removal {
                entry: &self.whitelist.entries[idx],
                strategy,
            }),
            Hit::Unattributed => None,
        }
    }

    fn match_non_exact(&self, domain: &str, identify: bool) -> Option<Hit> {
        if self.options.subdomain_matching {
            if let Some(idx) = self.parent_match(domain) {
                return Some(Hit::Attributed(idx, MatchStrategy::Subdomain));
            }
        }

        if let Some(ref combined) = self.whitelist.combined {
            if !combined.is_match(domain) {
                return None;
            }
            if !identify {
                return Some(Hit::Unattributed);
            }
        }

        self.identify_pattern(domain).map(|idx| {
            let kind = self.whitelist.entries[idx].kind();
            Hit::Attributed(idx, MatchStrategy::for_pattern(kind))
        })
    }

    /// Closest exact parent: for `a.b.c.d` tries `b.c.d`, then `c.d`, then `d`.
    fn parent_match(&self, domain: &str) -> Option<usize> {
        let mut current = domain;
        while let Some(pos) = current.find('.') {
            current = &current[pos + 1..];
            if let Some(&idx) = self.whitelist.exact.get(current) {
                return Some(idx);
            }
        }
        None
    }

    /// First matching wildcard in declaration order, else first matching regex.
    fn identify_pattern(&self, domain: &str) -> Option<usize> {
        self.whitelist
            .wildcards
            .iter()
            .chain(self.whitelist.regexes.iter())
            .copied()
            .find(|&idx| self.whitelist.entries[idx].is_match(domain))
    }
}
