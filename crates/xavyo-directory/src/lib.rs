//! # Directory Abstractions
//!
//! Core types for storing typed entities in an LDAP directory.
//!
//! This crate provides the pieces repositories are built from: names,
//! entries, native filters and queries, the client seam a directory server
//! is reached through, and the metadata that maps entities to entries.
//!
//! ## Architecture
//!
//! - [`DirectoryClient`] - One round-trip per call: create, update, lookup,
//!   search, unbind
//! - [`SearchHandler`] - Receives search results one entry at a time
//! - [`DirectoryEntity`] - Typed entity with property metadata
//! - [`EntityMapper`] - Entity ⇄ entry conversion, DN calculation and type
//!   filters
//! - [`InMemoryDirectory`] - In-process client for tests
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_directory::prelude::*;
//!
//! let directory = InMemoryDirectory::new();
//! let query = LdapQuery::builder()
//!     .base(Dn::parse("ou=people,dc=example,dc=com")?)
//!     .attributes(["cn", "mail"])
//!     .filter(Filter::eq("objectClass", "inetOrgPerson"));
//!
//! for entry in directory.find(&query).await? {
//!     println!("{}", entry.dn);
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`dn`] - Distinguished names
//! - [`entry`] - Attribute values, attribute sets and entries
//! - [`filter`] - Native filters (RFC 4515)
//! - [`query`] - Native queries
//! - [`client`] - Client and search handler traits
//! - [`entity`] - Entity metadata
//! - [`mapper`] - Entity mapping
//! - [`memory`] - In-memory directory
//! - [`config`] - Configuration types and traits
//! - [`error`] - Error types with transient/permanent classification

pub mod client;
pub mod config;
pub mod dn;
pub mod entity;
pub mod entry;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod memory;
pub mod query;
pub mod types;

pub use client::{CollectingHandler, CountingHandler, DirectoryClient, SearchHandler};
pub use entity::DirectoryEntity;
pub use mapper::EntityMapper;
pub use memory::InMemoryDirectory;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_directory::prelude::*;
/// ```
pub mod prelude {
    // Names and entries
    pub use crate::dn::{Dn, Rdn};
    pub use crate::entry::{AttributeSet, AttributeValue, DirectoryEntry, OBJECT_CLASS_ATTRIBUTE};

    // Queries
    pub use crate::filter::Filter;
    pub use crate::query::{LdapQuery, LdapQueryBuilder};
    pub use crate::types::SearchScope;

    // Error handling
    pub use crate::error::{DirectoryError, DirectoryResult};

    // Client
    pub use crate::client::{CollectingHandler, CountingHandler, DirectoryClient, SearchHandler};
    pub use crate::memory::InMemoryDirectory;

    // Entities
    pub use crate::entity::{DirectoryEntity, Persistable, PropertyDescriptor, PropertyKind};
    pub use crate::mapper::{EntityMapper, ObjectDirectoryMapper};

    // Configuration
    pub use crate::config::{ConnectionSettings, DirectoryConfig, RepositoryConfig, TlsConfig};
}

// Re-export async_trait for client implementors
pub use async_trait::async_trait;
