//! Entity repository
//!
//! [`EntryRepository`] stores and loads entities of one type through a
//! [`DirectoryClient`], using an [`EntityMapper`] for conversion, naming and
//! type filters.

use std::sync::Arc;

use tracing::{debug, instrument};
use xavyo_directory::client::{CountingHandler, DirectoryClient};
use xavyo_directory::config::{DirectoryConfig, RepositoryConfig};
use xavyo_directory::dn::Dn;
use xavyo_directory::entity::DirectoryEntity;
use xavyo_directory::entry::DirectoryEntry;
use xavyo_directory::error::{DirectoryError, DirectoryResult};
use xavyo_directory::filter::Filter;
use xavyo_directory::mapper::{EntityMapper, ObjectDirectoryMapper};
use xavyo_directory::query::LdapQuery;

/// Attribute requested by counting searches.
pub const COUNT_ATTRIBUTE: &str = "objectclass";

/// CRUD and native query operations for entities of type `T`.
pub struct EntryRepository<T> {
    client: Arc<dyn DirectoryClient>,
    mapper: Arc<dyn EntityMapper<T>>,
    config: RepositoryConfig,
}

impl<T> Clone for EntryRepository<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            mapper: Arc::clone(&self.mapper),
            config: self.config.clone(),
        }
    }
}

impl<T> std::fmt::Debug for EntryRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryRepository")
            .field("entity", &std::any::type_name::<T>())
            .field("client", &self.client.display_name())
            .field("config", &self.config)
            .finish()
    }
}

impl<T: DirectoryEntity> EntryRepository<T> {
    /// Create a repository with the default configuration.
    pub fn new(client: Arc<dyn DirectoryClient>, mapper: Arc<dyn EntityMapper<T>>) -> Self {
        Self {
            client,
            mapper,
            config: RepositoryConfig::default(),
        }
    }

    /// Create a repository with an explicit configuration.
    pub fn with_config(
        client: Arc<dyn DirectoryClient>,
        mapper: Arc<dyn EntityMapper<T>>,
        config: RepositoryConfig,
    ) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self {
            client,
            mapper,
            config,
        })
    }

    /// Create a repository mapping `T` through its own metadata, below
    /// `base`.
    pub fn for_entity(client: Arc<dyn DirectoryClient>, base: Dn) -> Self {
        Self::new(client, Arc::new(ObjectDirectoryMapper::<T>::new(base)))
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<dyn DirectoryClient> {
        &self.client
    }

    /// The entity mapper.
    pub fn mapper(&self) -> &Arc<dyn EntityMapper<T>> {
        &self.mapper
    }

    /// The repository configuration.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Base of every repository search.
    ///
    /// The configured base when set, the mapper's entity base otherwise.
    pub fn search_base(&self) -> DirectoryResult<Dn> {
        if self.config.base.is_root() {
            self.mapper.search_base()
        } else {
            Ok(self.config.base.clone())
        }
    }

    /// Create or update `entity`.
    ///
    /// An entity exposing [`Persistable`](xavyo_directory::entity::Persistable)
    /// decides itself whether it is new; otherwise an entity without an id
    /// is new. New entities get their computed name written back.
    #[instrument(skip(self, entity), fields(entity = std::any::type_name::<T>()))]
    pub async fn save(&self, mut entity: T) -> DirectoryResult<T> {
        let id = self.mapper.get_id(&entity);
        let is_new = match entity.as_persistable() {
            Some(persistable) => persistable.is_new(),
            None => id.is_none(),
        };

        let dn = match id {
            Some(dn) => dn,
            None => self.mapper.calculate_id(&entity)?,
        };

        if is_new {
            self.mapper.set_id(&mut entity, dn.clone());
            let entry = self.mapper.to_entry(&entity, dn);
            self.client.create(&entry).await?;
            debug!(dn = %entry.dn, "Created entity");
        } else {
            let entry = self.mapper.to_changes(&entity, dn);
            self.client.update(&entry).await?;
            debug!(dn = %entry.dn, "Updated entity");
        }
        Ok(entity)
    }

    /// Save every entity in order. The first failure stops the batch.
    pub async fn save_all(&self, entities: impl IntoIterator<Item = T>) -> DirectoryResult<Vec<T>> {
        let mut saved = Vec::new();
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    /// Load the entity named `dn`, or `None` when there is no such entry.
    #[instrument(skip(self, dn), fields(dn = %dn))]
    pub async fn find_by_id(&self, dn: &Dn) -> DirectoryResult<Option<T>> {
        Self::require_id(dn)?;
        match self.client.lookup(dn).await {
            Ok(entry) => self.mapper.from_entry(entry).map(Some),
            Err(DirectoryError::NotFound { .. }) => {
                debug!("Entity not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Check if an entity named `dn` exists.
    pub async fn exists_by_id(&self, dn: &Dn) -> DirectoryResult<bool> {
        Ok(self.find_by_id(dn).await?.is_some())
    }

    /// Every entity of this type below the search base.
    #[instrument(skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn find_all(&self) -> DirectoryResult<Vec<T>> {
        let entries = self.search_entries(None, Vec::new(), None).await?;
        self.to_entities(entries)
    }

    /// Load each of `ids`, skipping missing entries. Order follows `ids`.
    pub async fn find_all_by_id(&self, ids: &[Dn]) -> DirectoryResult<Vec<T>> {
        let mut found = Vec::with_capacity(ids.len());
        for dn in ids {
            if let Some(entity) = self.find_by_id(dn).await? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    /// Number of entities of this type, without materializing them.
    #[instrument(skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn count(&self) -> DirectoryResult<u64> {
        self.count_matching(None, None).await
    }

    /// Remove the entry named `dn`.
    #[instrument(skip(self, dn), fields(dn = %dn))]
    pub async fn delete_by_id(&self, dn: &Dn) -> DirectoryResult<()> {
        Self::require_id(dn)?;
        self.client.unbind(dn).await?;
        debug!("Deleted entity");
        Ok(())
    }

    /// Remove `entity`, named by its id or, lacking one, by its computed
    /// name.
    #[instrument(skip(self, entity), fields(entity = std::any::type_name::<T>()))]
    pub async fn delete(&self, entity: &T) -> DirectoryResult<()> {
        let dn = match self.mapper.get_id(entity) {
            Some(dn) => dn,
            None => self.mapper.calculate_id(entity)?,
        };
        let entry = self.mapper.to_entry(entity, dn);
        self.client.delete(&entry).await?;
        debug!(dn = %entry.dn, "Deleted entity");
        Ok(())
    }

    /// Remove each of `ids` in order. The first failure stops the batch.
    pub async fn delete_all_by_id(&self, ids: &[Dn]) -> DirectoryResult<()> {
        for dn in ids {
            self.delete_by_id(dn).await?;
        }
        Ok(())
    }

    /// Remove each of `entities` in order. The first failure stops the batch.
    pub async fn delete_all_entities(&self, entities: &[T]) -> DirectoryResult<()> {
        for entity in entities {
            self.delete(entity).await?;
        }
        Ok(())
    }

    /// Remove every entity of this type. Not atomic.
    #[instrument(skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn delete_all(&self) -> DirectoryResult<()> {
        let entities = self.find_all().await?;
        debug!(count = entities.len(), "Deleting all entities");
        self.delete_all_entities(&entities).await
    }

    /// Run a native query restricted to this entity type, expecting at most
    /// one match.
    #[instrument(skip(self, query), fields(filter = %query.filter))]
    pub async fn find_one_query(&self, query: &LdapQuery) -> DirectoryResult<Option<T>> {
        let query = self.restrict(query);
        match self.client.find_one(&query).await {
            Ok(entry) => self.mapper.from_entry(entry).map(Some),
            Err(DirectoryError::EmptyResult | DirectoryError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run a native query restricted to this entity type.
    #[instrument(skip(self, query), fields(filter = %query.filter))]
    pub async fn find_all_query(&self, query: &LdapQuery) -> DirectoryResult<Vec<T>> {
        let entries = self.client.find(&self.restrict(query)).await?;
        self.to_entities(entries)
    }

    /// Search entries of this type matching `criteria`.
    ///
    /// `attributes` empty fetches every attribute; `limit` bounds the
    /// number of returned entries.
    pub(crate) async fn search_entries(
        &self,
        criteria: Option<Filter>,
        attributes: Vec<String>,
        limit: Option<usize>,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let query = self.query_for(criteria, attributes, limit)?;
        self.client.find(&query).await
    }

    /// Count entries of this type matching `criteria`, fetching only the
    /// object class attribute.
    pub(crate) async fn count_matching(
        &self,
        criteria: Option<Filter>,
        limit: Option<usize>,
    ) -> DirectoryResult<u64> {
        let query = self.query_for(criteria, vec![COUNT_ATTRIBUTE.to_string()], limit)?;
        let mut handler = CountingHandler::new();
        self.client.search(&query, &mut handler).await?;
        debug!(rows = handler.rows(), "Counted entries");
        Ok(handler.rows())
    }

    /// Map a raw entry to an entity.
    pub(crate) fn to_entity(&self, entry: DirectoryEntry) -> DirectoryResult<T> {
        self.mapper.from_entry(entry)
    }

    fn to_entities(&self, entries: Vec<DirectoryEntry>) -> DirectoryResult<Vec<T>> {
        entries.into_iter().map(|e| self.to_entity(e)).collect()
    }

    fn query_for(
        &self,
        criteria: Option<Filter>,
        attributes: Vec<String>,
        limit: Option<usize>,
    ) -> DirectoryResult<LdapQuery> {
        let builder = LdapQuery::builder()
            .base(self.search_base()?)
            .scope(self.config.scope)
            .attributes(attributes);
        let builder = match limit {
            Some(limit) => builder.count_limit(limit),
            None => builder,
        };
        Ok(builder.filter(self.mapper.filter_for(criteria)))
    }

    fn restrict(&self, query: &LdapQuery) -> LdapQuery {
        query.with_filter(self.mapper.filter_for(Some(query.filter.clone())))
    }

    fn require_id(dn: &Dn) -> DirectoryResult<()> {
        if dn.is_root() {
            return Err(DirectoryError::invalid_argument(
                "entity id must not be the root DN",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xavyo_directory::entity::PropertyDescriptor;
    use xavyo_directory::entry::AttributeSet;
    use xavyo_directory::memory::InMemoryDirectory;
    use xavyo_directory::types::SearchScope;

    #[derive(Debug, Clone, PartialEq)]
    struct Group {
        dn: Option<Dn>,
        name: String,
    }

    impl DirectoryEntity for Group {
        const OBJECT_CLASSES: &'static [&'static str] = &["groupOfNames"];
        const BASE: &'static str = "ou=groups";
        const PROPERTIES: &'static [PropertyDescriptor] = &[
            PropertyDescriptor::id("dn"),
            PropertyDescriptor::naming("name", "cn"),
        ];

        fn id(&self) -> Option<&Dn> {
            self.dn.as_ref()
        }

        fn set_id(&mut self, id: Dn) {
            self.dn = Some(id);
        }

        fn to_attributes(&self) -> AttributeSet {
            AttributeSet::new().with("cn", self.name.as_str())
        }

        fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self> {
            let name = entry
                .attributes
                .get_string("cn")
                .unwrap_or_default()
                .to_string();
            Ok(Self {
                dn: Some(entry.dn),
                name,
            })
        }
    }

    fn group(name: &str) -> Group {
        Group {
            dn: None,
            name: name.to_string(),
        }
    }

    fn repository() -> (Arc<InMemoryDirectory>, EntryRepository<Group>) {
        let directory = Arc::new(InMemoryDirectory::new());
        let repository =
            EntryRepository::for_entity(directory.clone(), Dn::parse("dc=example").unwrap());
        (directory, repository)
    }

    #[tokio::test]
    async fn test_save_new_writes_back_id() {
        let (directory, repo) = repository();
        let saved = repo.save(group("admins")).await.unwrap();
        let dn = Dn::parse("cn=admins,ou=groups,dc=example").unwrap();
        assert_eq!(saved.dn.as_ref(), Some(&dn));
        assert!(directory.get(&dn).unwrap().has_object_class("groupOfNames"));
    }

    #[tokio::test]
    async fn test_count_requests_object_class_only() {
        let (directory, repo) = repository();
        repo.save_all([group("a"), group("b")]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
        let query = directory.last_query().unwrap();
        assert_eq!(query.attributes, vec!["objectclass".to_string()]);
        assert_eq!(query.base, Dn::parse("ou=groups,dc=example").unwrap());
    }

    #[tokio::test]
    async fn test_configured_base_and_scope() {
        let directory = Arc::new(InMemoryDirectory::new());
        let config = RepositoryConfig::new(Dn::parse("ou=teams,dc=example").unwrap())
            .with_scope(SearchScope::OneLevel);
        let repo = EntryRepository::<Group>::with_config(
            directory.clone(),
            Arc::new(ObjectDirectoryMapper::new(Dn::parse("dc=example").unwrap())),
            config,
        )
        .unwrap();
        repo.find_all().await.unwrap();
        let query = directory.last_query().unwrap();
        assert_eq!(query.base, Dn::parse("ou=teams,dc=example").unwrap());
        assert_eq!(query.scope, SearchScope::OneLevel);
    }

    #[tokio::test]
    async fn test_root_id_is_rejected_before_backend() {
        let (directory, repo) = repository();
        let err = repo.find_by_id(&Dn::root()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidArgument { .. }));
        let err = repo.delete_by_id(&Dn::root()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidArgument { .. }));
        assert_eq!(directory.search_count(), 0);
    }
}
