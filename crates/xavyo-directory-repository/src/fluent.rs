//! Fluent predicate queries
//!
//! A [`FluentQuery`] is an immutable description of a predicate search:
//! the predicate, the result type and the attributes to fetch. Refinements
//! return new queries; terminal operations run one search each.
//!
//! ```ignore
//! let summaries: Vec<PersonSummary> = people
//!     .query(Path::new("sn").eq("Doe"))
//!     .as_type::<PersonSummary>()
//!     .all()
//!     .await?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, instrument};
use xavyo_directory::entity::DirectoryEntity;
use xavyo_directory::entry::DirectoryEntry;
use xavyo_directory::error::{DirectoryError, DirectoryResult};

use crate::dto::EntityInstantiators;
use crate::predicate::{Predicate, PredicateTranslator};
use crate::projection::ProjectionFactory;
use crate::repository::{EntryRepository, COUNT_ATTRIBUTE};
use crate::result::{ResultShape, ResultType};
use crate::sort::{Pageable, Sort};

/// Collaborators shared by every query of one repository.
pub(crate) struct QueryContext<T> {
    pub(crate) repository: EntryRepository<T>,
    pub(crate) translator: Arc<dyn PredicateTranslator<T>>,
    pub(crate) projections: Arc<ProjectionFactory>,
    pub(crate) instantiators: Arc<EntityInstantiators>,
}

impl<T: DirectoryEntity> QueryContext<T> {
    fn convert<R>(&self, shape: &ResultShape<T, R>, entry: DirectoryEntry) -> DirectoryResult<R> {
        let entity = self.repository.to_entity(entry)?;
        match shape {
            ResultShape::Entity(identity) => Ok(identity(entity)),
            ResultShape::Projection { create, .. } => Ok(create(self.projections.as_ref(), entity)),
            ResultShape::Dto { convert } => convert(self.instantiators.as_ref(), &entity),
        }
    }
}

/// Predicate query over entities of type `T` returning `R`.
pub struct FluentQuery<T, R = T> {
    context: Arc<QueryContext<T>>,
    predicate: Predicate,
    sort: Sort,
    projection: Vec<String>,
    _result: PhantomData<fn() -> R>,
}

impl<T, R> Clone for FluentQuery<T, R> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            predicate: self.predicate.clone(),
            sort: self.sort.clone(),
            projection: self.projection.clone(),
            _result: PhantomData,
        }
    }
}

impl<T, R> std::fmt::Debug for FluentQuery<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluentQuery")
            .field("entity", &std::any::type_name::<T>())
            .field("result", &std::any::type_name::<R>())
            .field("predicate", &self.predicate)
            .field("projection", &self.projection)
            .finish_non_exhaustive()
    }
}

impl<T: DirectoryEntity> FluentQuery<T, T> {
    pub(crate) fn new(context: Arc<QueryContext<T>>, predicate: Predicate) -> Self {
        Self {
            context,
            predicate,
            sort: Sort::unsorted(),
            projection: Vec::new(),
            _result: PhantomData,
        }
    }
}

impl<T: DirectoryEntity, R: ResultType<T>> FluentQuery<T, R> {
    /// The query predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Explicitly selected attribute names, in caller order.
    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    /// The requested sort. Always unsorted.
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Same query returning `R2`.
    #[must_use]
    pub fn as_type<R2: ResultType<T>>(&self) -> FluentQuery<T, R2> {
        FluentQuery {
            context: Arc::clone(&self.context),
            predicate: self.predicate.clone(),
            sort: self.sort.clone(),
            projection: self.projection.clone(),
            _result: PhantomData,
        }
    }

    /// Same query fetching only `names`.
    pub fn project<I, S>(&self, names: I) -> DirectoryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let projection: Vec<String> = names.into_iter().map(Into::into).collect();
        if projection.iter().any(|name| name.trim().is_empty()) {
            return Err(DirectoryError::invalid_argument(
                "projected attribute names must not be blank",
            ));
        }
        Ok(Self {
            projection,
            ..self.clone()
        })
    }

    /// Directory searches have no generic ordering.
    pub fn sort_by(&self, _sort: Sort) -> DirectoryResult<Self> {
        Err(DirectoryError::unsupported("sort_by"))
    }

    /// The single match, or `None`.
    ///
    /// Fails with [`DirectoryError::ResultCardinality`] when more than one
    /// entry matches.
    #[instrument(skip(self), fields(result = std::any::type_name::<R>()))]
    pub async fn one(&self) -> DirectoryResult<Option<R>> {
        let mut entries = self.search(Some(2)).await?;
        match entries.len() {
            0 => Ok(None),
            1 => self.convert(entries.remove(0)).map(Some),
            actual => Err(DirectoryError::ResultCardinality {
                expected: 1,
                actual,
            }),
        }
    }

    /// The first match, or `None`.
    #[instrument(skip(self), fields(result = std::any::type_name::<R>()))]
    pub async fn first(&self) -> DirectoryResult<Option<R>> {
        let entries = self.search(Some(2)).await?;
        entries
            .into_iter()
            .next()
            .map(|entry| self.convert(entry))
            .transpose()
    }

    /// Every match, in directory order.
    pub async fn all(&self) -> DirectoryResult<Vec<R>> {
        self.stream().await?.collect()
    }

    /// Every match as a single-pass iterator.
    ///
    /// The search completes before this returns; each entry is converted
    /// when the iterator yields it.
    #[instrument(skip(self), fields(result = std::any::type_name::<R>()))]
    pub async fn stream(&self) -> DirectoryResult<QueryStream<T, R>> {
        let entries = self.search(None).await?;
        Ok(QueryStream {
            entries: entries.into_iter(),
            context: Arc::clone(&self.context),
            shape: R::shape(),
        })
    }

    /// Number of matches.
    #[instrument(skip(self))]
    pub async fn count(&self) -> DirectoryResult<u64> {
        let filter = self.context.translator.translate(&self.predicate)?;
        self.context
            .repository
            .count_matching(Some(filter), None)
            .await
    }

    /// Check if anything matches.
    #[instrument(skip(self))]
    pub async fn exists(&self) -> DirectoryResult<bool> {
        let filter = self.context.translator.translate(&self.predicate)?;
        let rows = self
            .context
            .repository
            .count_matching(Some(filter), Some(1))
            .await?;
        Ok(rows > 0)
    }

    /// Directory searches have no generic paging.
    pub async fn page(&self, _pageable: &Pageable) -> DirectoryResult<Vec<R>> {
        Err(DirectoryError::unsupported("page"))
    }

    /// Attributes to request for this query's result type.
    ///
    /// Empty means every attribute.
    pub fn attributes(&self) -> Vec<String> {
        if !self.projection.is_empty() {
            return self.projection.clone();
        }
        match R::shape() {
            ResultShape::Projection { information, .. } => {
                let information = information(self.context.projections.as_ref());
                let properties = information.input_properties();
                let attributes: Vec<String> = properties
                    .iter()
                    .copied()
                    .filter(|property| {
                        !matches!(T::descriptor(property), Some(d) if !d.is_mapped())
                    })
                    .map(|property| T::attribute_of(property).unwrap_or(property).to_string())
                    .collect();
                // Only the DN was asked for.
                if attributes.is_empty() && !properties.is_empty() {
                    return vec![COUNT_ATTRIBUTE.to_string()];
                }
                attributes
            }
            ResultShape::Entity(_) | ResultShape::Dto { .. } => Vec::new(),
        }
    }

    async fn search(&self, limit: Option<usize>) -> DirectoryResult<Vec<DirectoryEntry>> {
        let filter = self.context.translator.translate(&self.predicate)?;
        let attributes = self.attributes();
        debug!(%filter, ?attributes, ?limit, "Running fluent query");
        self.context
            .repository
            .search_entries(Some(filter), attributes, limit)
            .await
    }

    fn convert(&self, entry: DirectoryEntry) -> DirectoryResult<R> {
        self.context.convert(&R::shape(), entry)
    }
}

/// Results of [`FluentQuery::stream`].
pub struct QueryStream<T, R> {
    entries: std::vec::IntoIter<DirectoryEntry>,
    context: Arc<QueryContext<T>>,
    shape: ResultShape<T, R>,
}

impl<T: DirectoryEntity, R> Iterator for QueryStream<T, R> {
    type Item = DirectoryResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        Some(self.context.convert(&self.shape, entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<T: DirectoryEntity, R> ExactSizeIterator for QueryStream<T, R> {}

impl<T, R> std::fmt::Debug for QueryStream<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStream")
            .field("remaining", &self.entries.len())
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
