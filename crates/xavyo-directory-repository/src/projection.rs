//! Read-through projections
//!
//! A [`Projection`] is a narrow view over an entity. Instances are built from
//! a [`ProjectionProxy`] that reads the entity's properties on demand. A
//! closed projection declares its accessors up front, which lets queries
//! fetch only the attributes it needs; an open projection does not.
//!
//! ```
//! use xavyo_directory_repository::projection::{
//!     Projection, ProjectionInformation, ProjectionProxy,
//! };
//!
//! struct NameOnly(ProjectionProxy);
//!
//! impl Projection for NameOnly {
//!     fn information() -> ProjectionInformation {
//!         ProjectionInformation::closed(["cn"])
//!     }
//!
//!     fn from_proxy(proxy: ProjectionProxy) -> Self {
//!         Self(proxy)
//!     }
//! }
//!
//! assert_eq!(NameOnly::information().input_properties(), ["cn"]);
//! ```

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use xavyo_directory::entity::DirectoryEntity;
use xavyo_directory::entry::AttributeValue;

/// What a projection type reads from its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionInformation {
    /// Accessors known up front, in declaration order.
    Closed { properties: Vec<&'static str> },
    /// Accessors that cannot be enumerated.
    Open,
}

impl ProjectionInformation {
    /// A closed projection over `properties`.
    pub fn closed(properties: impl IntoIterator<Item = &'static str>) -> Self {
        ProjectionInformation::Closed {
            properties: properties.into_iter().collect(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ProjectionInformation::Closed { .. })
    }

    /// Source properties a closed projection reads. Empty when open.
    pub fn input_properties(&self) -> &[&'static str] {
        match self {
            ProjectionInformation::Closed { properties } => properties,
            ProjectionInformation::Open => &[],
        }
    }
}

/// A projection type.
pub trait Projection: Send + Sized + 'static {
    /// Describe the projection's accessors.
    fn information() -> ProjectionInformation;

    /// Wrap a proxy over the source entity.
    fn from_proxy(proxy: ProjectionProxy) -> Self;
}

/// Property reads by name.
pub trait PropertyAccessor: Send + Sync {
    /// Read `property`, or `None` when it is unknown or unset.
    fn read(&self, property: &str) -> Option<AttributeValue>;
}

impl<T: DirectoryEntity> PropertyAccessor for T {
    fn read(&self, property: &str) -> Option<AttributeValue> {
        self.property(property)
    }
}

/// Accessors a proxy may serve for one (source, projection) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorTable {
    /// `None` serves every property.
    readable: Option<HashSet<&'static str>>,
}

impl AccessorTable {
    fn build<S: DirectoryEntity>(information: &ProjectionInformation) -> Self {
        let readable = match information {
            ProjectionInformation::Closed { properties } => Some(
                properties
                    .iter()
                    .copied()
                    .filter(|p| S::descriptor(p).is_some())
                    .collect(),
            ),
            ProjectionInformation::Open => None,
        };
        Self { readable }
    }

    /// Check if `accessor` reads through to the source.
    pub fn serves(&self, accessor: &str) -> bool {
        self.readable
            .as_ref()
            .map_or(true, |readable| readable.contains(accessor))
    }
}

/// Read-through view over a source entity.
#[derive(Clone)]
pub struct ProjectionProxy {
    source: Arc<dyn PropertyAccessor>,
    accessors: Arc<AccessorTable>,
}

impl std::fmt::Debug for ProjectionProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionProxy")
            .field("accessors", &self.accessors)
            .finish_non_exhaustive()
    }
}

impl ProjectionProxy {
    /// Read `accessor` from the source.
    pub fn get(&self, accessor: &str) -> Option<AttributeValue> {
        if !self.accessors.serves(accessor) {
            return None;
        }
        self.source.read(accessor)
    }

    /// First value of `accessor` as a string.
    pub fn get_string(&self, accessor: &str) -> Option<String> {
        self.get(accessor)
            .and_then(|value| value.to_strings().into_iter().next())
    }

    /// Every value of `accessor` as strings. Empty when unset.
    pub fn get_strings(&self, accessor: &str) -> Vec<String> {
        self.get(accessor)
            .map(|value| value.to_strings())
            .unwrap_or_default()
    }

    pub fn get_integer(&self, accessor: &str) -> Option<i64> {
        self.get(accessor).and_then(|value| value.as_integer())
    }

    pub fn get_bool(&self, accessor: &str) -> Option<bool> {
        self.get(accessor).and_then(|value| value.as_boolean())
    }
}

/// Creates projections and caches their metadata.
///
/// Projection information is cached per projection type and accessor
/// tables per (source type, projection type) pair. Share one factory
/// through an `Arc`.
#[derive(Debug, Default)]
pub struct ProjectionFactory {
    information: DashMap<TypeId, Arc<ProjectionInformation>>,
    accessors: DashMap<(TypeId, TypeId), Arc<AccessorTable>>,
}

impl ProjectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Information for projection type `P`.
    pub fn projection_information<P: Projection>(&self) -> Arc<ProjectionInformation> {
        let key = TypeId::of::<P>();
        if let Some(cached) = self.information.get(&key) {
            return Arc::clone(cached.value());
        }

        let information = Arc::new(P::information());
        debug!(
            projection = std::any::type_name::<P>(),
            closed = information.is_closed(),
            "Resolved projection information"
        );
        self.information.insert(key, Arc::clone(&information));
        information
    }

    /// Wrap `source` in a projection of type `P`.
    pub fn create_projection<S: DirectoryEntity, P: Projection>(&self, source: S) -> P {
        let accessors = self.accessor_table::<S, P>();
        P::from_proxy(ProjectionProxy {
            source: Arc::new(source),
            accessors,
        })
    }

    fn accessor_table<S: DirectoryEntity, P: Projection>(&self) -> Arc<AccessorTable> {
        let key = (TypeId::of::<S>(), TypeId::of::<P>());
        if let Some(cached) = self.accessors.get(&key) {
            return Arc::clone(cached.value());
        }

        let table = Arc::new(AccessorTable::build::<S>(
            &self.projection_information::<P>(),
        ));
        self.accessors.insert(key, Arc::clone(&table));
        table
    }

    /// Number of cached accessor tables.
    pub fn cached_tables(&self) -> usize {
        self.accessors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xavyo_directory::dn::Dn;
    use xavyo_directory::entity::PropertyDescriptor;
    use xavyo_directory::entry::{AttributeSet, DirectoryEntry};
    use xavyo_directory::error::DirectoryResult;

    #[derive(Debug, Clone)]
    struct Host {
        dn: Option<Dn>,
        name: String,
        port: i64,
        secret: String,
    }

    impl DirectoryEntity for Host {
        const OBJECT_CLASSES: &'static [&'static str] = &["device"];
        const PROPERTIES: &'static [PropertyDescriptor] = &[
            PropertyDescriptor::id("dn"),
            PropertyDescriptor::naming("name", "cn"),
            PropertyDescriptor::attribute("port", "ipServicePort"),
            PropertyDescriptor::attribute("secret", "userPassword"),
        ];

        fn id(&self) -> Option<&Dn> {
            self.dn.as_ref()
        }

        fn set_id(&mut self, id: Dn) {
            self.dn = Some(id);
        }

        fn to_attributes(&self) -> AttributeSet {
            AttributeSet::new()
                .with("cn", self.name.as_str())
                .with("ipServicePort", self.port)
                .with("userPassword", self.secret.as_str())
        }

        fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self> {
            Ok(Self {
                name: entry.attributes.get_string("cn").unwrap_or_default().to_string(),
                port: 0,
                secret: String::new(),
                dn: Some(entry.dn),
            })
        }
    }

    struct Endpoint(ProjectionProxy);

    impl Projection for Endpoint {
        fn information() -> ProjectionInformation {
            ProjectionInformation::closed(["name", "port", "uptime"])
        }

        fn from_proxy(proxy: ProjectionProxy) -> Self {
            Self(proxy)
        }
    }

    struct Anything(ProjectionProxy);

    impl Projection for Anything {
        fn information() -> ProjectionInformation {
            ProjectionInformation::Open
        }

        fn from_proxy(proxy: ProjectionProxy) -> Self {
            Self(proxy)
        }
    }

    fn host() -> Host {
        Host {
            dn: Some(Dn::parse("cn=web,dc=example").unwrap()),
            name: "web".to_string(),
            port: 8080,
            secret: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_closed_projection_reads_declared_accessors_only() {
        let factory = ProjectionFactory::new();
        let Endpoint(proxy) = factory.create_projection::<_, Endpoint>(host());

        assert_eq!(proxy.get_string("name").as_deref(), Some("web"));
        assert_eq!(proxy.get_integer("port"), Some(8080));
        assert_eq!(proxy.get("uptime"), None);
        assert_eq!(proxy.get("secret"), None);
    }

    #[test]
    fn test_open_projection_reads_everything() {
        let factory = ProjectionFactory::new();
        let Anything(proxy) = factory.create_projection::<_, Anything>(host());
        assert_eq!(proxy.get_string("secret").as_deref(), Some("hunter2"));
        assert_eq!(proxy.get_strings("dn"), vec!["cn=web,dc=example".to_string()]);
    }

    #[test]
    fn test_metadata_is_cached() {
        let factory = ProjectionFactory::new();
        let first = factory.projection_information::<Endpoint>();
        let second = factory.projection_information::<Endpoint>();
        assert!(Arc::ptr_eq(&first, &second));

        factory.create_projection::<_, Endpoint>(host());
        factory.create_projection::<_, Endpoint>(host());
        factory.create_projection::<_, Anything>(host());
        assert_eq!(factory.cached_tables(), 2);
    }
}
