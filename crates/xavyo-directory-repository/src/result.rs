//! Result shapes of fluent queries
//!
//! Every type a fluent query can return implements [`ResultType`] for the
//! entity type it is read from. The shape decides which attributes are
//! fetched and how each entity is converted.
//!
//! Entities are their own result type. Projections and DTOs opt in:
//!
//! ```ignore
//! impl<S: DirectoryEntity> ResultType<S> for PersonSummary {
//!     fn shape() -> ResultShape<S, Self> {
//!         ResultShape::projection()
//!     }
//! }
//!
//! impl ResultType<Person> for PersonDto {
//!     fn shape() -> ResultShape<Person, Self> {
//!         ResultShape::dto()
//!     }
//! }
//! ```

use std::sync::Arc;

use xavyo_directory::entity::DirectoryEntity;
use xavyo_directory::error::DirectoryResult;

use crate::dto::{Dto, EntityInstantiators};
use crate::projection::{Projection, ProjectionFactory, ProjectionInformation};

/// How entities of type `S` become results of type `R`.
pub enum ResultShape<S, R> {
    /// The entity itself.
    Entity(fn(S) -> R),
    /// A read-through projection.
    Projection {
        information: fn(&ProjectionFactory) -> Arc<ProjectionInformation>,
        create: fn(&ProjectionFactory, S) -> R,
    },
    /// A DTO built through one of its constructors.
    Dto {
        convert: fn(&EntityInstantiators, &S) -> DirectoryResult<R>,
    },
}

impl<S: DirectoryEntity, R: Projection> ResultShape<S, R> {
    /// Shape of projection type `R`.
    pub fn projection() -> Self {
        ResultShape::Projection {
            information: |factory| factory.projection_information::<R>(),
            create: |factory, source| factory.create_projection::<S, R>(source),
        }
    }
}

impl<S: DirectoryEntity, R: Dto> ResultShape<S, R> {
    /// Shape of DTO type `R`.
    pub fn dto() -> Self {
        ResultShape::Dto {
            convert: |instantiators, source| instantiators.instantiate::<S, R>(source),
        }
    }
}

impl<S, R> std::fmt::Debug for ResultShape<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ResultShape::Entity(_) => "Entity",
            ResultShape::Projection { .. } => "Projection",
            ResultShape::Dto { .. } => "Dto",
        };
        f.write_str(kind)
    }
}

/// A type fluent queries over `S` can return.
pub trait ResultType<S>: Sized + Send + 'static {
    fn shape() -> ResultShape<S, Self>;
}

impl<T: DirectoryEntity> ResultType<T> for T {
    fn shape() -> ResultShape<T, T> {
        ResultShape::Entity(|entity| entity)
    }
}
