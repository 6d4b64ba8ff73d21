//! Directory type definitions
//!
//! Enums shared by queries and configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Depth of a directory search relative to its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Only the base entry itself.
    Base,
    /// Direct children of the base, excluding the base.
    #[serde(alias = "one")]
    OneLevel,
    /// The base and everything below it.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Get all search scopes.
    #[must_use]
    pub fn all() -> &'static [SearchScope] {
        &[SearchScope::Base, SearchScope::OneLevel, SearchScope::Subtree]
    }

    /// Get the string representation used in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Base => "base",
            SearchScope::OneLevel => "onelevel",
            SearchScope::Subtree => "subtree",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = ParseSearchScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(SearchScope::Base),
            "onelevel" | "one" => Ok(SearchScope::OneLevel),
            "subtree" | "sub" => Ok(SearchScope::Subtree),
            _ => Err(ParseSearchScopeError(s.to_string())),
        }
    }
}

/// Error parsing a search scope from string.
#[derive(Debug, Clone)]
pub struct ParseSearchScopeError(String);

impl fmt::Display for ParseSearchScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid search scope '{}', expected one of: base, onelevel, subtree",
            self.0
        )
    }
}

impl std::error::Error for ParseSearchScopeError {}
