//! Predicate executor
//!
//! [`PredicateRepository`] runs [`Predicate`] searches over an
//! [`EntryRepository`]. CRUD operations stay on the wrapped repository,
//! reachable through [`PredicateRepository::repository`].

use std::future::Future;
use std::sync::Arc;

use xavyo_directory::entity::DirectoryEntity;
use xavyo_directory::error::{DirectoryError, DirectoryResult};

use crate::dto::EntityInstantiators;
use crate::fluent::{FluentQuery, QueryContext};
use crate::predicate::{LdapPredicateTranslator, Predicate, PredicateTranslator};
use crate::projection::ProjectionFactory;
use crate::repository::EntryRepository;
use crate::sort::{Order, Pageable, Sort};

/// Predicate searches for entities of type `T`.
pub struct PredicateRepository<T> {
    context: Arc<QueryContext<T>>,
}

impl<T> Clone for PredicateRepository<T> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<T> std::fmt::Debug for PredicateRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateRepository")
            .field("repository", &self.context.repository)
            .finish_non_exhaustive()
    }
}

impl<T: DirectoryEntity> PredicateRepository<T> {
    /// Create an executor with fresh projection and DTO caches.
    pub fn new(repository: EntryRepository<T>, translator: Arc<dyn PredicateTranslator<T>>) -> Self {
        Self::with_collaborators(
            repository,
            translator,
            Arc::new(ProjectionFactory::new()),
            Arc::new(EntityInstantiators::new()),
        )
    }

    /// Create an executor translating predicates through entity metadata.
    pub fn for_repository(repository: EntryRepository<T>) -> Self {
        Self::new(repository, Arc::new(LdapPredicateTranslator::<T>::new()))
    }

    /// Create an executor sharing projection and DTO caches.
    pub fn with_collaborators(
        repository: EntryRepository<T>,
        translator: Arc<dyn PredicateTranslator<T>>,
        projections: Arc<ProjectionFactory>,
        instantiators: Arc<EntityInstantiators>,
    ) -> Self {
        Self {
            context: Arc::new(QueryContext {
                repository,
                translator,
                projections,
                instantiators,
            }),
        }
    }

    /// The wrapped repository.
    pub fn repository(&self) -> &EntryRepository<T> {
        &self.context.repository
    }

    /// Start a fluent query for `predicate`.
    pub fn query(&self, predicate: Predicate) -> FluentQuery<T> {
        FluentQuery::new(Arc::clone(&self.context), predicate)
    }

    /// Run `f` over a fluent query for `predicate`.
    ///
    /// ```ignore
    /// let count = people
    ///     .find_by(Path::new("sn").eq("Doe"), |q| async move { q.count().await })
    ///     .await?;
    /// ```
    pub async fn find_by<F, Fut, X>(&self, predicate: Predicate, f: F) -> DirectoryResult<X>
    where
        F: FnOnce(FluentQuery<T>) -> Fut,
        Fut: Future<Output = DirectoryResult<X>>,
    {
        f(self.query(predicate)).await
    }

    /// The single entity matching `predicate`, or `None`.
    pub async fn find_one(&self, predicate: Predicate) -> DirectoryResult<Option<T>> {
        self.query(predicate).one().await
    }

    /// Every entity matching `predicate`.
    pub async fn find_all(&self, predicate: Predicate) -> DirectoryResult<Vec<T>> {
        self.query(predicate).all().await
    }

    /// Number of entities matching `predicate`.
    pub async fn count(&self, predicate: Predicate) -> DirectoryResult<u64> {
        self.query(predicate).count().await
    }

    /// Check if any entity matches `predicate`.
    pub async fn exists(&self, predicate: Predicate) -> DirectoryResult<bool> {
        self.query(predicate).exists().await
    }

    pub async fn find_all_sorted(&self, _predicate: Predicate, _sort: Sort) -> DirectoryResult<Vec<T>> {
        Err(DirectoryError::unsupported("find_all_sorted"))
    }

    pub async fn find_all_ordered(&self, _orders: &[Order]) -> DirectoryResult<Vec<T>> {
        Err(DirectoryError::unsupported("find_all_ordered"))
    }

    pub async fn find_all_with_order(
        &self,
        _predicate: Predicate,
        _orders: &[Order],
    ) -> DirectoryResult<Vec<T>> {
        Err(DirectoryError::unsupported("find_all_with_order"))
    }

    pub async fn find_all_paged(
        &self,
        _predicate: Predicate,
        _pageable: &Pageable,
    ) -> DirectoryResult<Vec<T>> {
        Err(DirectoryError::unsupported("find_all_paged"))
    }
}
