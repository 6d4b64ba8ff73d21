//! Entity mapping metadata
//!
//! A [`DirectoryEntity`] is a typed domain object stored as a directory
//! entry. Its [`PropertyDescriptor`]s tie property names (what predicates,
//! projections and DTOs refer to) to directory attribute names.

use crate::dn::Dn;
use crate::entry::{AttributeSet, AttributeValue, DirectoryEntry};
use crate::error::DirectoryResult;

/// Role of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// The entity's distinguished name.
    Id,
    /// Attribute whose value forms the leftmost RDN of new entries.
    Naming,
    /// Plain directory attribute.
    Attribute,
    /// Property with no directory attribute behind it.
    Transient,
}

/// Maps one entity property to a directory attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyDescriptor {
    /// Property name as used by predicates and projections.
    pub name: &'static str,
    /// Directory attribute name. Empty for id and transient properties.
    pub attribute: &'static str,
    /// Role of the property.
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    /// The DN property.
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            attribute: "",
            kind: PropertyKind::Id,
        }
    }

    /// The naming attribute used to compute new DNs.
    pub const fn naming(name: &'static str, attribute: &'static str) -> Self {
        Self {
            name,
            attribute,
            kind: PropertyKind::Naming,
        }
    }

    /// A plain attribute.
    pub const fn attribute(name: &'static str, attribute: &'static str) -> Self {
        Self {
            name,
            attribute,
            kind: PropertyKind::Attribute,
        }
    }

    /// A property that is not stored in the directory.
    pub const fn transient(name: &'static str) -> Self {
        Self {
            name,
            attribute: "",
            kind: PropertyKind::Transient,
        }
    }

    /// Check if this is the DN property.
    pub fn is_id(&self) -> bool {
        self.kind == PropertyKind::Id
    }

    /// Check if a directory attribute backs this property.
    pub fn is_mapped(&self) -> bool {
        matches!(self.kind, PropertyKind::Naming | PropertyKind::Attribute)
    }
}

/// Entities that track their own persistence state.
pub trait Persistable {
    /// `true` when the entity has not been stored yet.
    fn is_new(&self) -> bool;
}

/// A typed object stored as a directory entry.
///
/// # Example
///
/// ```
/// use xavyo_directory::prelude::*;
///
/// #[derive(Clone)]
/// struct Group {
///     dn: Option<Dn>,
///     name: String,
/// }
///
/// impl DirectoryEntity for Group {
///     const OBJECT_CLASSES: &'static [&'static str] = &["top", "groupOfNames"];
///     const BASE: &'static str = "ou=groups";
///     const PROPERTIES: &'static [PropertyDescriptor] = &[
///         PropertyDescriptor::id("dn"),
///         PropertyDescriptor::naming("name", "cn"),
///     ];
///
///     fn id(&self) -> Option<&Dn> {
///         self.dn.as_ref()
///     }
///
///     fn set_id(&mut self, id: Dn) {
///         self.dn = Some(id);
///     }
///
///     fn to_attributes(&self) -> AttributeSet {
///         AttributeSet::new().with("cn", self.name.as_str())
///     }
///
///     fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self> {
///         let name = entry
///             .attributes
///             .get_string("cn")
///             .unwrap_or_default()
///             .to_string();
///         Ok(Self { dn: Some(entry.dn), name })
///     }
/// }
/// ```
pub trait DirectoryEntity: Clone + Send + Sync + Sized + 'static {
    /// Object classes written on create and used to filter searches.
    const OBJECT_CLASSES: &'static [&'static str];

    /// Entry base relative to the mapper's base, as an RFC 4514 string.
    const BASE: &'static str = "";

    /// Property metadata.
    const PROPERTIES: &'static [PropertyDescriptor];

    /// The entity's DN, if it has one.
    fn id(&self) -> Option<&Dn>;

    /// Record the DN the entity is stored under.
    fn set_id(&mut self, id: Dn);

    /// Directory attributes of the entity, excluding `objectClass`. Unset
    /// attributes are [`AttributeValue::Null`] or absent.
    fn to_attributes(&self) -> AttributeSet;

    /// Build an entity from a directory entry.
    ///
    /// Entries read under an attribute projection carry only the requested
    /// attributes, so a missing attribute maps to an unset value rather than
    /// an error.
    fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self>;

    /// Expose the [`Persistable`] capability when the entity has one.
    fn as_persistable(&self) -> Option<&dyn Persistable> {
        None
    }

    /// Read a property by name.
    ///
    /// Transient properties read as `None` unless the entity overrides this.
    fn property(&self, name: &str) -> Option<AttributeValue> {
        let descriptor = Self::descriptor(name)?;
        match descriptor.kind {
            PropertyKind::Id => self.id().map(|dn| AttributeValue::String(dn.to_string())),
            PropertyKind::Naming | PropertyKind::Attribute => self
                .to_attributes()
                .get(descriptor.attribute)
                .filter(|value| !value.is_null())
                .cloned(),
            PropertyKind::Transient => None,
        }
    }

    /// Look up a property descriptor by property name.
    fn descriptor(name: &str) -> Option<&'static PropertyDescriptor> {
        Self::PROPERTIES.iter().find(|p| p.name == name)
    }

    /// Attribute name backing `property`, if it is mapped.
    fn attribute_of(property: &str) -> Option<&'static str> {
        Self::descriptor(property)
            .filter(|p| p.is_mapped())
            .map(|p| p.attribute)
    }

    /// The naming property, if declared.
    fn naming_property() -> Option<&'static PropertyDescriptor> {
        Self::PROPERTIES
            .iter()
            .find(|p| p.kind == PropertyKind::Naming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Account {
        dn: Option<Dn>,
        uid: String,
        mail: Option<String>,
        stored: bool,
    }

    impl Persistable for Account {
        fn is_new(&self) -> bool {
            !self.stored
        }
    }

    impl DirectoryEntity for Account {
        const OBJECT_CLASSES: &'static [&'static str] = &["top", "account"];
        const BASE: &'static str = "ou=accounts";
        const PROPERTIES: &'static [PropertyDescriptor] = &[
            PropertyDescriptor::id("dn"),
            PropertyDescriptor::naming("uid", "uid"),
            PropertyDescriptor::attribute("email", "mail"),
            PropertyDescriptor::transient("stored"),
        ];

        fn id(&self) -> Option<&Dn> {
            self.dn.as_ref()
        }

        fn set_id(&mut self, id: Dn) {
            self.dn = Some(id);
        }

        fn to_attributes(&self) -> AttributeSet {
            AttributeSet::new()
                .with("uid", self.uid.as_str())
                .with("mail", self.mail.clone())
        }

        fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self> {
            let uid = entry
                .attributes
                .get_string("uid")
                .unwrap_or_default()
                .to_string();
            Ok(Self {
                mail: entry.attributes.get_string("mail").map(ToOwned::to_owned),
                dn: Some(entry.dn),
                uid,
                stored: true,
            })
        }

        fn as_persistable(&self) -> Option<&dyn Persistable> {
            Some(self)
        }
    }

    fn account() -> Account {
        Account {
            dn: Some(Dn::parse("uid=jdoe,ou=accounts").unwrap()),
            uid: "jdoe".to_string(),
            mail: None,
            stored: false,
        }
    }

    #[test]
    fn test_descriptor_lookup() {
        assert_eq!(Account::attribute_of("email"), Some("mail"));
        assert_eq!(Account::attribute_of("dn"), None);
        assert_eq!(Account::attribute_of("stored"), None);
        assert_eq!(Account::attribute_of("unknown"), None);
        assert_eq!(Account::naming_property().unwrap().attribute, "uid");
        assert!(Account::descriptor("dn").unwrap().is_id());
    }

    #[test]
    fn test_property_reads() {
        let account = account();
        assert_eq!(
            account.property("dn"),
            Some(AttributeValue::from("uid=jdoe,ou=accounts"))
        );
        assert_eq!(account.property("uid"), Some(AttributeValue::from("jdoe")));
        assert_eq!(account.property("email"), None);
        assert_eq!(account.property("stored"), None);
    }

    #[test]
    fn test_persistable_capability() {
        let account = account();
        assert!(account.as_persistable().unwrap().is_new());
    }
}
