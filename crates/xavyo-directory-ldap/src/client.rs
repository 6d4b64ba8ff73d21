//! LDAP directory client
//!
//! Implements [`DirectoryClient`] over an `ldap3` connection.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry, SearchOptions};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use xavyo_directory::client::{DirectoryClient, SearchHandler};
use xavyo_directory::config::DirectoryConfig;
use xavyo_directory::dn::Dn;
use xavyo_directory::entry::{AttributeSet, AttributeValue, DirectoryEntry};
use xavyo_directory::error::{DirectoryError, DirectoryResult};
use xavyo_directory::filter::Filter;
use xavyo_directory::query::LdapQuery;
use xavyo_directory::types::SearchScope;

use crate::config::LdapConfig;

/// LDAP result code: no such object.
const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: entry already exists.
const RC_ALREADY_EXISTS: u32 = 68;
/// LDAP result code: size limit exceeded.
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

type RawValues = HashSet<Vec<u8>>;

/// [`DirectoryClient`] talking to an LDAP server.
pub struct LdapDirectoryClient {
    /// Configuration.
    config: LdapConfig,

    /// Display name for this client instance.
    display_name: String,

    /// Cached LDAP connection (lazily initialized).
    connection: Arc<RwLock<Option<Ldap>>>,

    /// Whether the client has been disposed.
    disposed: Arc<RwLock<bool>>,
}

impl LdapDirectoryClient {
    /// Create a new LDAP client with the given configuration.
    ///
    /// No connection is opened until the first operation.
    pub fn new(config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;

        let display_name = format!("LDAP: {}", config.host);

        Ok(Self {
            config,
            display_name,
            connection: Arc::new(RwLock::new(None)),
            disposed: Arc::new(RwLock::new(false)),
        })
    }

    /// The client configuration.
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Unbind and drop the cached connection. Later operations fail.
    pub async fn dispose(&self) -> DirectoryResult<()> {
        *self.disposed.write().await = true;

        let mut conn_guard = self.connection.write().await;
        if let Some(mut ldap) = conn_guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind");
            }
        }

        info!("LDAP client disposed");
        Ok(())
    }

    /// Get an LDAP connection, creating one if necessary.
    async fn get_connection(&self) -> DirectoryResult<Ldap> {
        if *self.disposed.read().await {
            return Err(DirectoryError::invalid_configuration(
                "LDAP client has been disposed",
            ));
        }

        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let conn = self.create_connection().await?;

        {
            let mut conn_guard = self.connection.write().await;
            *conn_guard = Some(conn.clone());
        }

        Ok(conn)
    }

    /// Create a new LDAP connection and bind.
    async fn create_connection(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();

        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connection.connection_timeout())
            .set_starttls(self.config.use_starttls)
            .set_no_tls_verify(!self.config.tls.verify_certificate);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        if result.rc != 0 {
            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(DirectoryError::AuthenticationFailed);
            }
            return Err(DirectoryError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.host, "LDAP connection established successfully");

        Ok(ldap)
    }

    /// Map an LDAP result to the error taxonomy.
    fn check_result(result: &LdapResult, dn: &Dn, operation: &str) -> DirectoryResult<()> {
        match result.rc {
            0 => Ok(()),
            RC_NO_SUCH_OBJECT => Err(DirectoryError::NotFound { dn: dn.clone() }),
            RC_ALREADY_EXISTS => Err(DirectoryError::AlreadyExists { dn: dn.clone() }),
            RC_INVALID_CREDENTIALS => Err(DirectoryError::AuthenticationFailed),
            rc => Err(DirectoryError::operation_failed(
                rc,
                format!("LDAP {operation} failed with code {rc}: {}", result.text),
            )),
        }
    }

    fn scope(scope: SearchScope) -> Scope {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }

    /// Values of an attribute as sent over the wire. Binary values are sent
    /// unchanged.
    fn attribute_value_to_bytes(value: &AttributeValue) -> Vec<Vec<u8>> {
        match value {
            AttributeValue::Binary(b) => vec![b.clone()],
            AttributeValue::Array(arr) => arr
                .iter()
                .flat_map(Self::attribute_value_to_bytes)
                .collect(),
            other => other.to_strings().into_iter().map(String::into_bytes).collect(),
        }
    }

    /// Convert an LDAP search entry to a directory entry.
    fn search_entry_to_entry(entry: SearchEntry) -> DirectoryResult<DirectoryEntry> {
        let dn = Dn::parse(&entry.dn).map_err(|e| {
            DirectoryError::mapping(format!("server returned an invalid DN '{}': {e}", entry.dn))
        })?;

        let mut attrs = AttributeSet::new();

        for (name, mut values) in entry.attrs {
            match values.len() {
                0 => {}
                1 => attrs.set(name, values.remove(0)),
                _ => attrs.set(
                    name,
                    AttributeValue::Array(values.into_iter().map(AttributeValue::String).collect()),
                ),
            }
        }

        for (name, mut values) in entry.bin_attrs {
            match values.len() {
                0 => {}
                1 => attrs.set(name, AttributeValue::Binary(values.remove(0))),
                _ => attrs.set(
                    name,
                    AttributeValue::Array(values.into_iter().map(AttributeValue::Binary).collect()),
                ),
            }
        }

        Ok(DirectoryEntry::new(dn, attrs))
    }

    /// Attributes of `entry` in the shape `ldap3` expects for an add.
    fn add_attributes(entry: &DirectoryEntry) -> Vec<(Vec<u8>, RawValues)> {
        let mut attrs: Vec<(Vec<u8>, RawValues)> = entry
            .attributes
            .iter()
            .map(|(name, value)| {
                (
                    name.clone().into_bytes(),
                    Self::attribute_value_to_bytes(value).into_iter().collect::<RawValues>(),
                )
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();
        attrs.sort_by(|a, b| a.0.cmp(&b.0));
        attrs
    }

    /// Modifications writing `desired` onto `current`: replace every
    /// attribute `desired` sets and delete those it nulls out. Attributes
    /// `desired` does not name are left alone.
    fn modifications(current: &DirectoryEntry, desired: &DirectoryEntry) -> Vec<Mod<Vec<u8>>> {
        let mut mods = Vec::new();

        let mut names: Vec<&String> = desired.attributes.iter().map(|(name, _)| name).collect();
        names.sort();
        for name in names {
            let values: RawValues = desired
                .attributes
                .get(name)
                .map(Self::attribute_value_to_bytes)
                .unwrap_or_default()
                .into_iter()
                .collect();
            if values.is_empty() {
                if current.attributes.has(name) {
                    mods.push(Mod::Delete(name.clone().into_bytes(), HashSet::new()));
                }
            } else {
                mods.push(Mod::Replace(name.clone().into_bytes(), values));
            }
        }

        mods
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;
        let base = self.config.base_dn.to_string();

        let result = ldap
            .with_timeout(self.config.connection.read_timeout())
            .search(&base, Scope::Base, "(objectClass=*)", vec!["1.1"])
            .await
            .map_err(|e| DirectoryError::connection_failed_with_source("Test search failed", e))?;

        let (entries, _res) = result.success().map_err(|e| {
            DirectoryError::connection_failed(format!("Test search failed: {e}"))
        })?;

        if entries.is_empty() {
            return Err(DirectoryError::connection_failed(format!(
                "Base DN '{base}' not found or not accessible"
            )));
        }

        info!("LDAP connection test successful");
        Ok(())
    }

    #[instrument(skip(self, entry), fields(dn = %entry.dn))]
    async fn create(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;
        let dn = entry.dn.to_string();

        debug!("Creating LDAP entry");

        let result = ldap
            .with_timeout(self.config.connection.read_timeout())
            .add(&dn, Self::add_attributes(entry))
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Failed to create entry: {dn}"),
                    e,
                )
            })?;
        Self::check_result(&result, &entry.dn, "add")?;

        info!("LDAP entry created successfully");
        Ok(())
    }

    #[instrument(skip(self, entry), fields(dn = %entry.dn))]
    async fn update(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        let current = self.lookup(&entry.dn).await?;
        let mods = Self::modifications(&current, entry);
        if mods.is_empty() {
            debug!("No changes to apply");
            return Ok(());
        }

        let mut ldap = self.get_connection().await?;
        let dn = entry.dn.to_string();

        debug!(modifications = mods.len(), "Updating LDAP entry");

        let result = ldap
            .with_timeout(self.config.connection.read_timeout())
            .modify(&dn, mods)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Failed to update entry: {dn}"),
                    e,
                )
            })?;
        Self::check_result(&result, &entry.dn, "modify")?;

        info!("LDAP entry updated successfully");
        Ok(())
    }

    #[instrument(skip(self, dn), fields(dn = %dn))]
    async fn lookup(&self, dn: &Dn) -> DirectoryResult<DirectoryEntry> {
        let mut ldap = self.get_connection().await?;
        let base = dn.to_string();

        let result = ldap
            .with_timeout(self.config.connection.read_timeout())
            .search(&base, Scope::Base, &Filter::everything().to_ldap_string(), vec!["*"])
            .await
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP lookup failed", e))?;

        let ldap3::SearchResult(entries, res) = result;
        Self::check_result(&res, dn, "lookup")?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::NotFound { dn: dn.clone() })?;
        Self::search_entry_to_entry(SearchEntry::construct(entry))
    }

    #[instrument(skip(self, query, handler), fields(base = %query.base, filter = %query.filter))]
    async fn search(
        &self,
        query: &LdapQuery,
        handler: &mut dyn SearchHandler,
    ) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;
        let base = query.base.to_string();
        let filter = query.filter.to_ldap_string();
        let attrs: Vec<&str> = if query.attributes.is_empty() {
            vec!["*"]
        } else {
            query.attributes.iter().map(String::as_str).collect()
        };

        let mut options = SearchOptions::new();
        if let Some(limit) = query.count_limit {
            options = options.sizelimit(i32::try_from(limit).unwrap_or(i32::MAX));
        }

        debug!(scope = %query.scope, count_limit = ?query.count_limit, "Searching LDAP");

        let result = ldap
            .with_search_options(options)
            .with_timeout(self.config.connection.read_timeout())
            .search(&base, Self::scope(query.scope), &filter, attrs)
            .await
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP search failed", e))?;

        let ldap3::SearchResult(entries, res) = result;
        if res.rc == RC_SIZE_LIMIT_EXCEEDED && query.count_limit.is_some() {
            debug!("Size limit reached");
        } else {
            Self::check_result(&res, &query.base, "search")?;
        }

        let total = entries.len();
        for entry in entries {
            handler.handle(Self::search_entry_to_entry(SearchEntry::construct(entry))?)?;
        }

        debug!(total_found = total, "LDAP search completed");
        Ok(())
    }

    #[instrument(skip(self, dn), fields(dn = %dn))]
    async fn unbind(&self, dn: &Dn) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;
        let target = dn.to_string();

        debug!("Deleting LDAP entry");

        let result = ldap
            .with_timeout(self.config.connection.read_timeout())
            .delete(&target)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("Failed to delete entry: {target}"),
                    e,
                )
            })?;
        Self::check_result(&result, dn, "delete")?;

        info!("LDAP entry deleted successfully");
        Ok(())
    }
}

impl std::fmt::Debug for LdapDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectoryClient")
            .field("display_name", &self.display_name)
            .field("config", &self.config.redacted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ldap_result(rc: u32) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: "server message".to_string(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        }
    }

    fn entry(attributes: AttributeSet) -> DirectoryEntry {
        DirectoryEntry::new(Dn::parse("cn=John,dc=example,dc=com").unwrap(), attributes)
    }

    fn config() -> LdapConfig {
        LdapConfig::new(
            "ldap.example.com",
            Dn::parse("dc=example,dc=com").unwrap(),
            "cn=admin,dc=example,dc=com",
        )
        .with_password("secret")
    }

    #[test]
    fn test_new_validates_config() {
        let client = LdapDirectoryClient::new(config()).unwrap();
        assert_eq!(client.display_name(), "LDAP: ldap.example.com");

        let mut invalid = config();
        invalid.host = String::new();
        assert!(LdapDirectoryClient::new(invalid).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let client = LdapDirectoryClient::new(config()).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_check_result_codes() {
        let dn = Dn::parse("cn=x").unwrap();
        assert!(LdapDirectoryClient::check_result(&ldap_result(0), &dn, "add").is_ok());
        assert!(matches!(
            LdapDirectoryClient::check_result(&ldap_result(32), &dn, "delete"),
            Err(DirectoryError::NotFound { .. })
        ));
        assert!(matches!(
            LdapDirectoryClient::check_result(&ldap_result(68), &dn, "add"),
            Err(DirectoryError::AlreadyExists { .. })
        ));
        assert!(matches!(
            LdapDirectoryClient::check_result(&ldap_result(49), &dn, "search"),
            Err(DirectoryError::AuthenticationFailed)
        ));
        match LdapDirectoryClient::check_result(&ldap_result(50), &dn, "modify") {
            Err(DirectoryError::OperationFailed { code, message, .. }) => {
                assert_eq!(code, Some(50));
                assert!(message.contains("modify"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_scope_mapping() {
        assert!(matches!(LdapDirectoryClient::scope(SearchScope::Base), Scope::Base));
        assert!(matches!(
            LdapDirectoryClient::scope(SearchScope::OneLevel),
            Scope::OneLevel
        ));
        assert!(matches!(
            LdapDirectoryClient::scope(SearchScope::Subtree),
            Scope::Subtree
        ));
    }

    #[test]
    fn test_attribute_value_to_bytes() {
        assert_eq!(
            LdapDirectoryClient::attribute_value_to_bytes(&AttributeValue::from("John")),
            vec![b"John".to_vec()]
        );
        assert_eq!(
            LdapDirectoryClient::attribute_value_to_bytes(&AttributeValue::from(true)),
            vec![b"TRUE".to_vec()]
        );
        assert_eq!(
            LdapDirectoryClient::attribute_value_to_bytes(&AttributeValue::Binary(vec![0, 159])),
            vec![vec![0, 159]]
        );
        assert_eq!(
            LdapDirectoryClient::attribute_value_to_bytes(&AttributeValue::from(vec!["a", "b"])),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
        assert!(LdapDirectoryClient::attribute_value_to_bytes(&AttributeValue::Null).is_empty());
    }

    #[test]
    fn test_search_entry_conversion() {
        let mut attrs = HashMap::new();
        attrs.insert("cn".to_string(), vec!["John".to_string()]);
        attrs.insert(
            "objectClass".to_string(),
            vec!["top".to_string(), "person".to_string()],
        );
        let mut bin_attrs = HashMap::new();
        bin_attrs.insert("jpegPhoto".to_string(), vec![vec![1u8, 2, 3]]);

        let converted = LdapDirectoryClient::search_entry_to_entry(SearchEntry {
            dn: "cn=John,dc=example,dc=com".to_string(),
            attrs,
            bin_attrs,
        })
        .unwrap();

        assert_eq!(converted.dn, Dn::parse("cn=john,dc=example,dc=com").unwrap());
        assert_eq!(converted.attributes.get_string("cn"), Some("John"));
        assert_eq!(converted.object_classes(), vec!["top", "person"]);
        assert_eq!(
            converted.attributes.get("jpegPhoto"),
            Some(&AttributeValue::Binary(vec![1, 2, 3]))
        );
    }

    #[test]
    fn test_search_entry_with_invalid_dn() {
        let err = LdapDirectoryClient::search_entry_to_entry(SearchEntry {
            dn: "not a dn".to_string(),
            attrs: HashMap::new(),
            bin_attrs: HashMap::new(),
        })
        .unwrap_err();
        assert!(matches!(err, DirectoryError::Mapping { .. }));
    }

    #[test]
    fn test_add_attributes_skip_empty_values() {
        let attrs = LdapDirectoryClient::add_attributes(&entry(
            AttributeSet::new()
                .with("cn", "John")
                .with("mail", AttributeValue::Null)
                .with("objectClass", vec!["top", "person"]),
        ));
        let names: Vec<&[u8]> = attrs.iter().map(|(name, _)| name.as_slice()).collect();
        assert_eq!(names, vec![b"cn".as_slice(), b"objectClass".as_slice()]);
        assert_eq!(attrs[1].1.len(), 2);
    }

    #[test]
    fn test_modifications() {
        let current = entry(
            AttributeSet::new()
                .with("cn", "John")
                .with("mail", "old@example.com")
                .with("telephoneNumber", "555-1234"),
        );
        let desired = entry(
            AttributeSet::new()
                .with("cn", "John")
                .with("mail", "new@example.com")
                .with("description", AttributeValue::Null),
        );

        let mods = LdapDirectoryClient::modifications(&current, &desired);
        assert_eq!(mods.len(), 2);
        assert!(matches!(&mods[0], Mod::Replace(name, _) if name == b"cn"));
        assert!(matches!(
            &mods[1],
            Mod::Replace(name, values) if name == b"mail" && values.contains(b"new@example.com".as_slice())
        ));
    }

    #[test]
    fn test_modifications_leave_unmanaged_attributes() {
        let current = entry(
            AttributeSet::new()
                .with("cn", "John")
                .with("mail", "john@example.com")
                .with("telephoneNumber", "555-1234")
                .with("userPassword", "{SSHA}abc"),
        );
        let desired = entry(
            AttributeSet::new()
                .with("cn", "John")
                .with("mail", AttributeValue::Null),
        );

        let mods = LdapDirectoryClient::modifications(&current, &desired);
        assert_eq!(mods.len(), 2);
        assert!(matches!(&mods[0], Mod::Replace(name, _) if name == b"cn"));
        assert!(matches!(&mods[1], Mod::Delete(name, values) if name == b"mail" && values.is_empty()));
    }
}
