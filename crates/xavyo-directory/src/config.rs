//! Directory configuration types
//!
//! Base trait and common configuration structures shared by directory
//! clients and repositories.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::dn::Dn;
use crate::error::{DirectoryError, DirectoryResult};
use crate::types::SearchScope;

/// Trait for directory configuration sections.
pub trait DirectoryConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Validate the configuration.
    ///
    /// Returns an error if the configuration is invalid.
    fn validate(&self) -> DirectoryResult<()>;

    /// Create a redacted version of this config (for logging/display).
    fn redacted(&self) -> Self;
}

/// Connection settings shared by directory clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Operation timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl ConnectionSettings {
    /// Create new connection settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Set the operation timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Get connection timeout as Duration.
    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get operation timeout as Duration.
    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.read_timeout_secs)
    }

    /// Check that both timeouts are non-zero.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.connection_timeout_secs == 0 {
            return Err(DirectoryError::invalid_configuration(
                "connection_timeout_secs must be greater than zero",
            ));
        }
        if self.read_timeout_secs == 0 {
            return Err(DirectoryError::invalid_configuration(
                "read_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// SSL/TLS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Whether to use SSL/TLS.
    #[serde(default)]
    pub enabled: bool,

    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verify_certificate: true,
        }
    }
}

impl TlsConfig {
    /// Create a new TLS config with SSL enabled.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Log a warning when certificate verification is switched off.
    ///
    /// Call after deserializing TLS settings from an external source.
    pub fn validate_security(&self) {
        if self.enabled && !self.verify_certificate {
            tracing::warn!(
                target: "security",
                "TLS certificate verification is disabled; only use this against local test servers"
            );
        }
    }
}

/// Where a repository keeps its entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Base DN of repository searches. The root DN means the mapper's
    /// entity base.
    #[serde(default)]
    pub base: Dn,

    /// Scope of repository searches below the base.
    #[serde(default)]
    pub scope: SearchScope,
}

impl RepositoryConfig {
    /// Create a config for entries under `base`.
    pub fn new(base: Dn) -> Self {
        Self {
            base,
            scope: SearchScope::Subtree,
        }
    }

    /// Set the search scope.
    #[must_use]
    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }
}

impl DirectoryConfig for RepositoryConfig {
    fn validate(&self) -> DirectoryResult<()> {
        if self.scope == SearchScope::Base {
            return Err(DirectoryError::invalid_configuration(
                "repository scope must be onelevel or subtree",
            ));
        }
        Ok(())
    }

    fn redacted(&self) -> Self {
        self.clone()
    }
}
