//! Entity to entry mapping
//!
//! [`EntityMapper`] converts between typed entities and
//! [`DirectoryEntry`] values and knows how entities are identified and
//! filtered. [`ObjectDirectoryMapper`] drives all of this from
//! [`DirectoryEntity`] metadata.

use std::marker::PhantomData;

use crate::dn::Dn;
use crate::entity::DirectoryEntity;
use crate::entry::{AttributeSet, AttributeValue, DirectoryEntry, OBJECT_CLASS_ATTRIBUTE};
use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::Filter;

/// Converts entities of type `T` to and from directory entries.
pub trait EntityMapper<T>: Send + Sync {
    /// The entity's DN, if it has one.
    fn get_id(&self, entity: &T) -> Option<Dn>;

    /// Record the DN an entity is stored under.
    fn set_id(&self, entity: &mut T, id: Dn);

    /// Compute the DN a new entity will be created under.
    fn calculate_id(&self, entity: &T) -> DirectoryResult<Dn>;

    /// Base under which entities of this type live.
    fn search_base(&self) -> DirectoryResult<Dn>;

    /// Filter selecting entities of this type, narrowed by `criteria`.
    fn filter_for(&self, criteria: Option<Filter>) -> Filter;

    /// Directory entry for `entity` stored under `dn`.
    fn to_entry(&self, entity: &T, dn: Dn) -> DirectoryEntry;

    /// Changes writing `entity` onto the entry stored under `dn`.
    ///
    /// Carries every attribute the mapping manages; unset ones are
    /// [`AttributeValue::Null`] so the update removes them.
    fn to_changes(&self, entity: &T, dn: Dn) -> DirectoryEntry;

    /// Entity built from `entry`.
    fn from_entry(&self, entry: DirectoryEntry) -> DirectoryResult<T>;
}

/// [`EntityMapper`] driven by [`DirectoryEntity`] metadata.
///
/// DNs are absolute: an entity's DN is its naming RDN, then
/// [`DirectoryEntity::BASE`], then the mapper's base.
#[derive(Debug, Clone)]
pub struct ObjectDirectoryMapper<T> {
    base: Dn,
    _entity: PhantomData<fn() -> T>,
}

impl<T: DirectoryEntity> ObjectDirectoryMapper<T> {
    /// Create a mapper for entries below `base`.
    pub fn new(base: Dn) -> Self {
        Self {
            base,
            _entity: PhantomData,
        }
    }

    /// Base the entity bases are relative to.
    pub fn base(&self) -> &Dn {
        &self.base
    }
}

impl<T: DirectoryEntity> EntityMapper<T> for ObjectDirectoryMapper<T> {
    fn get_id(&self, entity: &T) -> Option<Dn> {
        entity.id().filter(|dn| !dn.is_root()).cloned()
    }

    fn set_id(&self, entity: &mut T, id: Dn) {
        entity.set_id(id);
    }

    fn calculate_id(&self, entity: &T) -> DirectoryResult<Dn> {
        let naming = T::naming_property().ok_or_else(|| {
            DirectoryError::mapping(format!(
                "{} declares no naming attribute",
                std::any::type_name::<T>()
            ))
        })?;

        let value = entity
            .to_attributes()
            .get(naming.attribute)
            .and_then(|value| value.to_strings().into_iter().next())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                DirectoryError::mapping(format!(
                    "naming attribute '{}' is not set",
                    naming.attribute
                ))
            })?;

        Ok(self.search_base()?.child(naming.attribute, value))
    }

    fn search_base(&self) -> DirectoryResult<Dn> {
        let relative = Dn::parse(T::BASE)
            .map_err(|e| DirectoryError::mapping(format!("invalid entity base: {e}")))?;
        Ok(relative.append(&self.base))
    }

    fn filter_for(&self, criteria: Option<Filter>) -> Filter {
        let mut filters: Vec<Filter> = T::OBJECT_CLASSES
            .iter()
            .map(|oc| Filter::eq(OBJECT_CLASS_ATTRIBUTE, *oc))
            .collect();
        filters.extend(criteria);

        match filters.len() {
            0 => Filter::everything(),
            1 => filters.remove(0),
            _ => Filter::and(filters),
        }
    }

    fn to_entry(&self, entity: &T, dn: Dn) -> DirectoryEntry {
        let mut attributes: AttributeSet = entity
            .to_attributes()
            .into_map()
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        attributes.set(
            OBJECT_CLASS_ATTRIBUTE,
            AttributeValue::from(T::OBJECT_CLASSES.to_vec()),
        );
        DirectoryEntry::new(dn, attributes)
    }

    fn to_changes(&self, entity: &T, dn: Dn) -> DirectoryEntry {
        let mut entry = self.to_entry(entity, dn);
        for property in T::PROPERTIES.iter().filter(|p| p.is_mapped()) {
            if !entry.attributes.has(property.attribute) {
                entry.attributes.set(property.attribute, AttributeValue::Null);
            }
        }
        entry
    }

    fn from_entry(&self, entry: DirectoryEntry) -> DirectoryResult<T> {
        T::from_entry(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PropertyDescriptor;

    #[derive(Debug, Clone, PartialEq)]
    struct Device {
        dn: Option<Dn>,
        name: String,
        serial: Option<String>,
    }

    impl DirectoryEntity for Device {
        const OBJECT_CLASSES: &'static [&'static str] = &["top", "device"];
        const BASE: &'static str = "ou=devices";
        const PROPERTIES: &'static [PropertyDescriptor] = &[
            PropertyDescriptor::id("dn"),
            PropertyDescriptor::naming("name", "cn"),
            PropertyDescriptor::attribute("serial", "serialNumber"),
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
                .with("serialNumber", self.serial.clone())
        }

        fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self> {
            Ok(Self {
                name: entry
                    .attributes
                    .get_string("cn")
                    .unwrap_or_default()
                    .to_string(),
                serial: entry
                    .attributes
                    .get_string("serialNumber")
                    .map(ToOwned::to_owned),
                dn: Some(entry.dn),
            })
        }
    }

    fn mapper() -> ObjectDirectoryMapper<Device> {
        ObjectDirectoryMapper::new(Dn::parse("dc=example,dc=com").unwrap())
    }

    fn device(name: &str) -> Device {
        Device {
            dn: None,
            name: name.to_string(),
            serial: None,
        }
    }

    #[test]
    fn test_calculate_id() {
        let dn = mapper().calculate_id(&device("printer, 2nd floor")).unwrap();
        assert_eq!(
            dn.to_string(),
            "cn=printer\\, 2nd floor,ou=devices,dc=example,dc=com"
        );
        assert_eq!(dn.rdn().unwrap().value(), "printer, 2nd floor");
    }

    #[test]
    fn test_calculate_id_requires_naming_value() {
        let err = mapper().calculate_id(&device("")).unwrap_err();
        assert!(matches!(err, DirectoryError::Mapping { .. }));
    }

    #[test]
    fn test_get_id_ignores_root() {
        let mut d = device("a");
        assert_eq!(mapper().get_id(&d), None);
        d.dn = Some(Dn::root());
        assert_eq!(mapper().get_id(&d), None);
        mapper().set_id(&mut d, Dn::parse("cn=a").unwrap());
        assert_eq!(mapper().get_id(&d), Some(Dn::parse("cn=a").unwrap()));
    }

    #[test]
    fn test_filter_for() {
        let m = mapper();
        assert_eq!(
            m.filter_for(None).to_ldap_string(),
            "(&(objectClass=top)(objectClass=device))"
        );
        assert_eq!(
            m.filter_for(Some(Filter::eq("cn", "a"))).to_ldap_string(),
            "(&(objectClass=top)(objectClass=device)(cn=a))"
        );
    }

    #[test]
    fn test_to_entry_skips_null_and_adds_object_classes() {
        let dn = Dn::parse("cn=a,ou=devices,dc=example,dc=com").unwrap();
        let entry = mapper().to_entry(&device("a"), dn.clone());
        assert_eq!(entry.dn, dn);
        assert!(!entry.attributes.has("serialNumber"));
        assert_eq!(entry.object_classes(), vec!["top", "device"]);
    }

    #[test]
    fn test_to_changes_clears_unset_mapped_attributes() {
        let dn = Dn::parse("cn=a,ou=devices,dc=example,dc=com").unwrap();
        let changes = mapper().to_changes(&device("a"), dn);
        assert_eq!(changes.attributes.get("serialNumber"), Some(&AttributeValue::Null));
        assert_eq!(changes.attributes.get_string("cn"), Some("a"));
        assert_eq!(changes.attributes.len(), 3);
    }

    #[test]
    fn test_from_entry() {
        let entry = DirectoryEntry::new(
            Dn::parse("cn=a,ou=devices").unwrap(),
            AttributeSet::new().with("cn", "a").with("serialNumber", "X1"),
        );
        let d = mapper().from_entry(entry).unwrap();
        assert_eq!(d.serial.as_deref(), Some("X1"));
        assert_eq!(d.dn, Some(Dn::parse("cn=a,ou=devices").unwrap()));
    }
}
