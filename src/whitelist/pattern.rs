//! Whitelist pattern kinds and entries.

use regex::Regex;
use std::fmt;

use crate::error::PatternError;

/// PatternKind represents how a whitelist entry matches domains.
///
/// Subdomain matching is not a kind of its own: it is a strategy applied to
/// every [`PatternKind::Exact`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// A single domain, compared literally
    Exact,
    /// A `*` glob anchored to the full domain
    Wildcard,
    /// A `/.../` regular expression
    Regex,
}

impl PatternKind {
    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Exact => "exact",
            PatternKind::Wildcard => "wildcard",
            PatternKind::Regex => "regex",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Translate a glob into an anchored regex source.
///
/// `.` becomes a literal dot and `*` matches any sequence. Other regex
/// metacharacters are passed through untouched.
pub fn wildcard_to_regex(pattern: &str) -> String {
    format!("^{}$", pattern.replace('.', r"\.").replace('*', ".*"))
}

/// Lowercase a glob, leaving the character after each `\` untouched so
/// escapes such as `\W` keep their meaning.
fn fold_case(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(c);
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// A single whitelist pattern plus the domains it removed during a run.
#[derive(Debug, Clone)]
pub struct WhitelistEntry {
    /// Raw pattern text; the key of the entry
    pattern: String,
    kind: PatternKind,
    /// Compiled form for wildcard and regex entries
    matcher: Option<Regex>,
    /// Removed domains credited to this entry, in removal order
    matches: Vec<String>,
}

impl WhitelistEntry {
    /// Create an exact entry from an already canonical domain.
    pub fn exact(domain: impl Into<String>) -> Self {
        Self {
            pattern: domain.into(),
            kind: PatternKind::Exact,
            matcher: None,
            matches: Vec::new(),
        }
    }

    /// Compile a glob such as `*.ads.example.com`.
    pub fn wildcard(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let matcher = Regex::new(&wildcard_to_regex(&fold_case(pattern)))
            .map_err(PatternError::InvalidWildcard)?;
        Ok(Self {
            pattern: pattern.to_string(),
            kind: PatternKind::Wildcard,
            matcher: Some(matcher),
            matches: Vec::new(),
        })
    }

    /// Compile a `/.../` line. The enclosed text is used as-is.
    pub fn regex(line: &str) -> Result<Self, PatternError> {
        let body = line
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
            .unwrap_or(line);
        if body.is_empty() {
            return Err(PatternError::Empty);
        }
        let matcher = Regex::new(body).map_err(PatternError::InvalidRegex)?;
        Ok(Self {
            pattern: line.to_string(),
            kind: PatternKind::Regex,
            matcher: Some(matcher),
            matches: Vec::new(),
        })
    }

    /// Raw pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Kind of this entry.
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Compiled matcher (wildcard and regex entries only).
    pub fn matcher(&self) -> Option<&Regex> {
        self.matcher.as_ref()
    }

    /// Domains credited to this entry so far.
    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    /// Number of domains credited to this entry so far.
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Check a canonical domain against this entry alone.
    ///
    /// Exact entries compare literally; subdomain coverage is decided by the
    /// filter engine, not here.
    pub fn is_match(&self, domain: &str) -> bool {
        match self.matcher {
            Some(ref re) => re.is_match(domain),
            None => self.pattern == domain,
        }
    }

    pub(crate) fn record(&mut self, domain: &str) {
        self.matches.push(domain.to_string());
    }

    pub(crate) fn clear_matches(&mut self) {
        self.matches.clear();
    }
}
