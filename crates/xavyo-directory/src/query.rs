//! Native directory queries
//!
//! An [`LdapQuery`] is what a [`DirectoryClient`](crate::client::DirectoryClient)
//! executes: a base, a scope, a filter, the attributes to return and an
//! optional count limit.

use serde::{Deserialize, Serialize};

use crate::dn::Dn;
use crate::filter::Filter;
use crate::types::SearchScope;

/// A directory search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdapQuery {
    /// Search base.
    pub base: Dn,

    /// Search scope relative to the base.
    #[serde(default)]
    pub scope: SearchScope,

    /// Search filter.
    pub filter: Filter,

    /// Attributes to return. Empty means all user attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,

    /// Maximum number of entries the server should return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_limit: Option<usize>,
}

impl LdapQuery {
    /// Start building a query.
    pub fn builder() -> LdapQueryBuilder {
        LdapQueryBuilder::default()
    }

    /// A subtree query for `filter` under `base`.
    pub fn new(base: Dn, filter: Filter) -> Self {
        Self {
            base,
            scope: SearchScope::Subtree,
            filter,
            attributes: Vec::new(),
            count_limit: None,
        }
    }

    /// Same query with a different filter.
    #[must_use]
    pub fn with_filter(&self, filter: Filter) -> Self {
        Self {
            filter,
            ..self.clone()
        }
    }

    /// Check if the query restricts the returned attributes.
    pub fn restricts_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }
}

/// Builder for [`LdapQuery`]. Every setter consumes and returns the builder.
#[derive(Debug, Clone, Default)]
pub struct LdapQueryBuilder {
    base: Dn,
    scope: SearchScope,
    filter: Option<Filter>,
    attributes: Vec<String>,
    count_limit: Option<usize>,
}

impl LdapQueryBuilder {
    /// Set the search base.
    #[must_use]
    pub fn base(mut self, base: Dn) -> Self {
        self.base = base;
        self
    }

    /// Set the search scope.
    #[must_use]
    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the attributes to return.
    #[must_use]
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Limit the number of returned entries.
    #[must_use]
    pub fn count_limit(mut self, limit: usize) -> Self {
        self.count_limit = Some(limit);
        self
    }

    /// Set the filter and finish the query.
    pub fn filter(mut self, filter: Filter) -> LdapQuery {
        self.filter = Some(filter);
        self.build()
    }

    /// Finish the query. Without a filter every entry matches.
    pub fn build(self) -> LdapQuery {
        LdapQuery {
            base: self.base,
            scope: self.scope,
            filter: self.filter.unwrap_or_else(Filter::everything),
            attributes: self.attributes,
            count_limit: self.count_limit,
        }
    }
}
