//! # Directory Repositories
//!
//! Typed repositories and predicate queries over a
//! [`DirectoryClient`](xavyo_directory::DirectoryClient).
//!
//! ## Architecture
//!
//! - [`EntryRepository`] - CRUD and native queries for one entity type
//! - [`PredicateRepository`] - Predicate searches over an `EntryRepository`
//! - [`FluentQuery`] - Immutable query builder with deferred execution
//! - [`ProjectionFactory`] - Read-through projections over entities
//! - [`EntityInstantiators`] - Constructor-based DTO conversion
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use xavyo_directory::prelude::*;
//! use xavyo_directory_repository::prelude::*;
//!
//! let directory = Arc::new(InMemoryDirectory::new());
//! let people = PredicateRepository::for_repository(EntryRepository::<Person>::for_entity(
//!     directory,
//!     Dn::parse("dc=example,dc=com")?,
//! ));
//!
//! people.repository().save(Person::new("John", "Doe")).await?;
//!
//! let john = people
//!     .find_by(Path::new("cn").eq("John"), |q| async move {
//!         q.as_type::<PersonSummary>().one().await
//!     })
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`repository`] - Entity repository
//! - [`predicate`] - Predicates and their translation to filters
//! - [`fluent`] - Fluent queries
//! - [`predicate_repository`] - Predicate executor
//! - [`projection`] - Projections
//! - [`dto`] - DTO conversion
//! - [`result`] - Result shapes
//! - [`sort`] - Sort and page requests

pub mod dto;
pub mod fluent;
pub mod predicate;
pub mod predicate_repository;
pub mod projection;
pub mod repository;
pub mod result;
pub mod sort;

pub use dto::{Constructor, ConstructorArgs, Dto, DtoInstantiatingConverter, EntityInstantiators};
pub use fluent::{FluentQuery, QueryStream};
pub use predicate::{LdapPredicateTranslator, Path, Predicate, PredicateTranslator};
pub use predicate_repository::PredicateRepository;
pub use projection::{Projection, ProjectionFactory, ProjectionInformation, ProjectionProxy};
pub use repository::EntryRepository;
pub use result::{ResultShape, ResultType};
pub use sort::{Direction, Order, Pageable, Sort};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dto::{Constructor, ConstructorArgs, Dto, EntityInstantiators};
    pub use crate::fluent::{FluentQuery, QueryStream};
    pub use crate::predicate::{LdapPredicateTranslator, Path, Predicate, PredicateTranslator};
    pub use crate::predicate_repository::PredicateRepository;
    pub use crate::projection::{
        Projection, ProjectionFactory, ProjectionInformation, ProjectionProxy,
    };
    pub use crate::repository::EntryRepository;
    pub use crate::result::{ResultShape, ResultType};
    pub use crate::sort::{Direction, Order, Pageable, Sort};
}
