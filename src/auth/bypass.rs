// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paths exempt from authentication.

/// Marker that turns a pattern into a prefix match.
const WILDCARD: char = '*';

/// A configured bypass pattern: exact, or prefix when it ends in `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassRule {
    pattern: String,
    is_wildcard: bool,
}

impl BypassRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let is_wildcard = pattern.ends_with(WILDCARD);
        Self {
            pattern,
            is_wildcard,
        }
    }

    /// Parse a comma-separated list, dropping blank entries.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Self::new)
            .collect()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }

    /// Exact equality, or prefix match with only the trailing `*` removed.
    ///
    /// `/health/*` matches `/health/` and `/health/live` but not `/health`.
    pub fn matches(&self, path: &str) -> bool {
        if path == self.pattern {
            return true;
        }
        self.is_wildcard
            && self
                .pattern
                .strip_suffix(WILDCARD)
                .is_some_and(|prefix| path.starts_with(prefix))
    }
}

/// Whether any rule exempts `path`. An empty rule list never matches.
pub fn is_bypassed(path: &str, rules: &[BypassRule]) -> bool {
    rules.iter().any(|rule| rule.matches(path))
}
