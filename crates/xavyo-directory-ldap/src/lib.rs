//! # LDAP Directory Client
//!
//! [`DirectoryClient`](xavyo_directory::DirectoryClient) implementation for
//! LDAP v3 servers.
//!
//! ## Features
//!
//! - LDAP v3 protocol support via `ldap3`
//! - SSL/TLS and STARTTLS
//! - Lazily opened, cached connection with simple bind
//! - Server size limits for bounded searches
//! - Result codes mapped to [`DirectoryError`](xavyo_directory::error::DirectoryError)
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_directory::prelude::*;
//! use xavyo_directory_ldap::{LdapConfig, LdapDirectoryClient};
//!
//! let config = LdapConfig::new(
//!     "ldap.example.com",
//!     Dn::parse("dc=example,dc=com")?,
//!     "cn=admin,dc=example,dc=com",
//! )
//! .with_password("secret")
//! .with_ssl();
//!
//! let client = LdapDirectoryClient::new(config)?;
//! client.test_connection().await?;
//! ```

pub mod client;
pub mod config;

// Re-exports
pub use client::LdapDirectoryClient;
pub use config::LdapConfig;
