//! Directory client traits
//!
//! The seam between repositories and a directory server. Clients work on
//! [`DirectoryEntry`] values; converting entries to typed entities is the
//! job of an [`EntityMapper`](crate::mapper::EntityMapper).

use async_trait::async_trait;

use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::error::{DirectoryError, DirectoryResult};
use crate::query::LdapQuery;

/// Receives the entries of a search one at a time.
pub trait SearchHandler: Send {
    /// Handle one entry. Returning an error aborts the search.
    fn handle(&mut self, entry: DirectoryEntry) -> DirectoryResult<()>;
}

impl<F> SearchHandler for F
where
    F: FnMut(DirectoryEntry) -> DirectoryResult<()> + Send,
{
    fn handle(&mut self, entry: DirectoryEntry) -> DirectoryResult<()> {
        self(entry)
    }
}

/// Collects every entry of a search.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    entries: Vec<DirectoryEntry>,
}

impl CollectingHandler {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected entries in the order the server returned them.
    pub fn into_entries(self) -> Vec<DirectoryEntry> {
        self.entries
    }
}

impl SearchHandler for CollectingHandler {
    fn handle(&mut self, entry: DirectoryEntry) -> DirectoryResult<()> {
        self.entries.push(entry);
        Ok(())
    }
}

/// Counts the entries of a search without keeping them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingHandler {
    rows: u64,
}

impl CountingHandler {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries seen.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl SearchHandler for CountingHandler {
    fn handle(&mut self, _entry: DirectoryEntry) -> DirectoryResult<()> {
        self.rows += 1;
        Ok(())
    }
}

/// Access to a directory server.
///
/// Implementations perform exactly one server round-trip per call and never
/// retry; resilience belongs to the caller.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Get the display name for this client instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the directory server.
    async fn test_connection(&self) -> DirectoryResult<()>;

    /// Add a new entry.
    ///
    /// Fails with [`DirectoryError::AlreadyExists`] when the name is taken.
    async fn create(&self, entry: &DirectoryEntry) -> DirectoryResult<()>;

    /// Write the attributes of `entry` onto an existing entry.
    ///
    /// A [`Null`](crate::entry::AttributeValue::Null) value removes the
    /// attribute. Attributes `entry` does not name are left untouched.
    /// Fails with [`DirectoryError::NotFound`] when the entry is missing.
    async fn update(&self, entry: &DirectoryEntry) -> DirectoryResult<()>;

    /// Read the entry stored at `dn`.
    ///
    /// Fails with [`DirectoryError::NotFound`] when the entry is missing.
    async fn lookup(&self, dn: &Dn) -> DirectoryResult<DirectoryEntry>;

    /// Run `query`, handing every returned entry to `handler` in server
    /// order.
    async fn search(
        &self,
        query: &LdapQuery,
        handler: &mut dyn SearchHandler,
    ) -> DirectoryResult<()>;

    /// Remove the entry stored at `dn`.
    ///
    /// Fails with [`DirectoryError::NotFound`] when the entry is missing.
    async fn unbind(&self, dn: &Dn) -> DirectoryResult<()>;

    /// Remove `entry`.
    async fn delete(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        self.unbind(&entry.dn).await
    }

    /// Run `query` and collect the entries.
    async fn find(&self, query: &LdapQuery) -> DirectoryResult<Vec<DirectoryEntry>> {
        let mut handler = CollectingHandler::new();
        self.search(query, &mut handler).await?;
        Ok(handler.into_entries())
    }

    /// Run `query` expecting exactly one entry.
    ///
    /// Fails with [`DirectoryError::EmptyResult`] when nothing matches and
    /// with [`DirectoryError::ResultCardinality`] when several entries do.
    async fn find_one(&self, query: &LdapQuery) -> DirectoryResult<DirectoryEntry> {
        let mut entries = self.find(query).await?;
        match entries.len() {
            0 => Err(DirectoryError::EmptyResult),
            1 => Ok(entries.remove(0)),
            actual => Err(DirectoryError::ResultCardinality {
                expected: 1,
                actual,
            }),
        }
    }
}
