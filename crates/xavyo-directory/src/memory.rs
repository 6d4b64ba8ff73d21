//! In-process directory
//!
//! [`InMemoryDirectory`] is a complete [`DirectoryClient`] that keeps its
//! entries in insertion order and records every query it executes. It is
//! meant for tests and local development.

use async_trait::async_trait;
use std::sync::RwLock;
use tracing::{debug, instrument};

use crate::client::{DirectoryClient, SearchHandler};
use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::error::{DirectoryError, DirectoryResult};
use crate::query::LdapQuery;
use crate::types::SearchScope;

/// A directory held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<Vec<DirectoryEntry>>,
    queries: RwLock<Vec<LdapQuery>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `entries`, in order.
    pub fn with_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
            queries: RwLock::new(Vec::new()),
        }
    }

    /// Add or replace an entry without going through the client API.
    pub fn insert(&self, entry: DirectoryEntry) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| e.dn == entry.dn) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<DirectoryEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Get an entry by name.
    pub fn get(&self, dn: &Dn) -> Option<DirectoryEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| &e.dn == dn)
            .cloned()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check if the directory holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every query executed so far, oldest first.
    pub fn queries(&self) -> Vec<LdapQuery> {
        self.queries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recently executed query.
    pub fn last_query(&self) -> Option<LdapQuery> {
        self.queries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// Number of searches executed so far.
    pub fn search_count(&self) -> usize {
        self.queries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Forget recorded queries.
    pub fn clear_queries(&self) {
        self.queries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn in_scope(dn: &Dn, base: &Dn, scope: SearchScope) -> bool {
        match scope {
            SearchScope::Base => dn == base,
            SearchScope::OneLevel => dn.parent().as_ref() == Some(base),
            SearchScope::Subtree => dn.ends_with(base),
        }
    }

    fn matching(&self, query: &LdapQuery) -> Vec<DirectoryEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|e| Self::in_scope(&e.dn, &query.base, query.scope))
            .filter(|e| query.filter.matches(&e.attributes))
            .take(query.count_limit.unwrap_or(usize::MAX))
            .map(|e| {
                let mut entry = e.clone();
                entry.attributes.retain_named(&query.attributes);
                entry
            })
            .collect()
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    fn display_name(&self) -> &str {
        "in-memory"
    }

    async fn test_connection(&self) -> DirectoryResult<()> {
        Ok(())
    }

    #[instrument(skip(self, entry), fields(dn = %entry.dn))]
    async fn create(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        if entry.dn.is_root() {
            return Err(DirectoryError::invalid_argument(
                "cannot create an entry at the root DN",
            ));
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|e| e.dn == entry.dn) {
            return Err(DirectoryError::AlreadyExists {
                dn: entry.dn.clone(),
            });
        }
        entries.push(entry.clone());
        debug!("Created entry");
        Ok(())
    }

    #[instrument(skip(self, entry), fields(dn = %entry.dn))]
    async fn update(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let existing = entries
            .iter_mut()
            .find(|e| e.dn == entry.dn)
            .ok_or_else(|| DirectoryError::NotFound {
                dn: entry.dn.clone(),
            })?;
        for (name, value) in entry.attributes.iter() {
            if value.is_null() {
                existing.attributes.remove(name);
            } else {
                existing.attributes.set(name.clone(), value.clone());
            }
        }
        debug!("Updated entry");
        Ok(())
    }

    async fn lookup(&self, dn: &Dn) -> DirectoryResult<DirectoryEntry> {
        self.get(dn)
            .ok_or_else(|| DirectoryError::NotFound { dn: dn.clone() })
    }

    #[instrument(skip(self, query, handler), fields(base = %query.base, filter = %query.filter))]
    async fn search(
        &self,
        query: &LdapQuery,
        handler: &mut dyn SearchHandler,
    ) -> DirectoryResult<()> {
        self.queries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());

        let results = self.matching(query);
        debug!(count = results.len(), "Search completed");
        for entry in results {
            handler.handle(entry)?;
        }
        Ok(())
    }

    #[instrument(skip(self, dn), fields(dn = %dn))]
    async fn unbind(&self, dn: &Dn) -> DirectoryResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let position = entries
            .iter()
            .position(|e| &e.dn == dn)
            .ok_or_else(|| DirectoryError::NotFound { dn: dn.clone() })?;
        entries.remove(position);
        debug!("Deleted entry");
        Ok(())
    }
}
