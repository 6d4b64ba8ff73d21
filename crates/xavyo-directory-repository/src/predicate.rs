//! Entity predicates
//!
//! A [`Predicate`] is a boolean expression over entity *properties*. It is
//! turned into a native [`Filter`] by a [`PredicateTranslator`], which
//! resolves property names to directory attribute names.
//!
//! ```
//! use xavyo_directory_repository::predicate::Path;
//!
//! let active_admins = Path::new("department")
//!     .eq("IT")
//!     .and(Path::new("employeeNumber").goe(1000))
//!     .and(Path::new("mail").is_not_null());
//! assert_eq!(active_admins.properties(), vec!["department", "employeeNumber", "mail"]);
//! ```

use std::marker::PhantomData;

use xavyo_directory::entity::DirectoryEntity;
use xavyo_directory::entry::AttributeValue;
use xavyo_directory::error::{DirectoryError, DirectoryResult};
use xavyo_directory::filter::Filter;

/// Boolean expression over entity properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { property: String, value: AttributeValue },
    Ne { property: String, value: AttributeValue },
    /// SQL-style pattern: `%` matches any run of characters. `_` and `*`
    /// are literal.
    Like { property: String, pattern: String },
    StartsWith { property: String, value: String },
    EndsWith { property: String, value: String },
    Contains { property: String, value: String },
    Goe { property: String, value: AttributeValue },
    Loe { property: String, value: AttributeValue },
    Gt { property: String, value: AttributeValue },
    Lt { property: String, value: AttributeValue },
    IsNull { property: String },
    IsNotNull { property: String },
    In { property: String, values: Vec<AttributeValue> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction of `predicates`.
    pub fn all_of(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    /// Disjunction of `predicates`.
    pub fn any_of(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    /// This predicate AND `other`.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut predicates) => {
                predicates.push(other);
                Predicate::And(predicates)
            }
            _ => Predicate::And(vec![self, other]),
        }
    }

    /// This predicate OR `other`.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut predicates) => {
                predicates.push(other);
                Predicate::Or(predicates)
            }
            _ => Predicate::Or(vec![self, other]),
        }
    }

    /// Negation of this predicate.
    #[must_use]
    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Property names referenced by this predicate, in order of appearance,
    /// without duplicates.
    pub fn properties(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_properties(&mut names);
        names
    }

    fn collect_properties<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Predicate::And(predicates) | Predicate::Or(predicates) => {
                for p in predicates {
                    p.collect_properties(names);
                }
            }
            Predicate::Not(inner) => inner.collect_properties(names),
            leaf => {
                if let Some(property) = leaf.property() {
                    if !names.contains(&property) {
                        names.push(property);
                    }
                }
            }
        }
    }

    fn property(&self) -> Option<&str> {
        match self {
            Predicate::Eq { property, .. }
            | Predicate::Ne { property, .. }
            | Predicate::Like { property, .. }
            | Predicate::StartsWith { property, .. }
            | Predicate::EndsWith { property, .. }
            | Predicate::Contains { property, .. }
            | Predicate::Goe { property, .. }
            | Predicate::Loe { property, .. }
            | Predicate::Gt { property, .. }
            | Predicate::Lt { property, .. }
            | Predicate::IsNull { property }
            | Predicate::IsNotNull { property }
            | Predicate::In { property, .. } => Some(property),
            Predicate::And(_) | Predicate::Or(_) | Predicate::Not(_) => None,
        }
    }
}

/// Builds leaf predicates on one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    property: String,
}

impl Path {
    /// Path to `property`.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }

    /// The property name.
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn eq(&self, value: impl Into<AttributeValue>) -> Predicate {
        Predicate::Eq {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn ne(&self, value: impl Into<AttributeValue>) -> Predicate {
        Predicate::Ne {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    /// `%` in `pattern` matches any run of characters. LDAP has no
    /// single-character wildcard, so `_` is matched literally.
    pub fn like(&self, pattern: impl Into<String>) -> Predicate {
        Predicate::Like {
            property: self.property.clone(),
            pattern: pattern.into(),
        }
    }

    pub fn starts_with(&self, value: impl Into<String>) -> Predicate {
        Predicate::StartsWith {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn ends_with(&self, value: impl Into<String>) -> Predicate {
        Predicate::EndsWith {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn contains(&self, value: impl Into<String>) -> Predicate {
        Predicate::Contains {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn goe(&self, value: impl Into<AttributeValue>) -> Predicate {
        Predicate::Goe {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn loe(&self, value: impl Into<AttributeValue>) -> Predicate {
        Predicate::Loe {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn gt(&self, value: impl Into<AttributeValue>) -> Predicate {
        Predicate::Gt {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn lt(&self, value: impl Into<AttributeValue>) -> Predicate {
        Predicate::Lt {
            property: self.property.clone(),
            value: value.into(),
        }
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            property: self.property.clone(),
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNotNull {
            property: self.property.clone(),
        }
    }

    pub fn in_values<V: Into<AttributeValue>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::In {
            property: self.property.clone(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Turns predicates into native filters for entities of type `T`.
pub trait PredicateTranslator<T>: Send + Sync {
    /// Translate `predicate`. Fails with
    /// [`DirectoryError::InvalidArgument`] for predicates that cannot be
    /// expressed.
    fn translate(&self, predicate: &Predicate) -> DirectoryResult<Filter>;
}

/// [`PredicateTranslator`] resolving properties through
/// [`DirectoryEntity`] metadata.
pub struct LdapPredicateTranslator<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for LdapPredicateTranslator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapPredicateTranslator")
            .field("entity", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Clone for LdapPredicateTranslator<T> {
    fn clone(&self) -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T: DirectoryEntity> Default for LdapPredicateTranslator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DirectoryEntity> LdapPredicateTranslator<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    fn attribute(property: &str) -> DirectoryResult<&'static str> {
        match T::descriptor(property) {
            Some(descriptor) if descriptor.is_mapped() => Ok(descriptor.attribute),
            Some(_) => Err(DirectoryError::invalid_argument(format!(
                "property '{property}' is not stored as a directory attribute"
            ))),
            None => Err(DirectoryError::invalid_argument(format!(
                "unknown property '{property}' on {}",
                std::any::type_name::<T>()
            ))),
        }
    }

    fn single_value(property: &str, value: &AttributeValue) -> DirectoryResult<String> {
        let mut values = value.to_strings();
        if values.len() != 1 {
            return Err(DirectoryError::invalid_argument(format!(
                "predicate on '{property}' needs exactly one value, got {}",
                values.len()
            )));
        }
        Ok(values.remove(0))
    }

    fn translate_all(&self, predicates: &[Predicate], kind: &str) -> DirectoryResult<Vec<Filter>> {
        if predicates.is_empty() {
            return Err(DirectoryError::invalid_argument(format!(
                "empty {kind} predicate"
            )));
        }
        predicates.iter().map(|p| self.translate(p)).collect()
    }
}

impl<T: DirectoryEntity> PredicateTranslator<T> for LdapPredicateTranslator<T> {
    fn translate(&self, predicate: &Predicate) -> DirectoryResult<Filter> {
        let filter = match predicate {
            Predicate::Eq { property, value } => {
                Filter::eq(Self::attribute(property)?, Self::single_value(property, value)?)
            }
            Predicate::Ne { property, value } => Filter::negate(Filter::eq(
                Self::attribute(property)?,
                Self::single_value(property, value)?,
            )),
            Predicate::Like { property, pattern } => {
                Filter::pattern(Self::attribute(property)?, pattern, '%')
            }
            Predicate::StartsWith { property, value } => {
                Filter::starts_with(Self::attribute(property)?, value.as_str())
            }
            Predicate::EndsWith { property, value } => {
                Filter::ends_with(Self::attribute(property)?, value.as_str())
            }
            Predicate::Contains { property, value } => {
                Filter::contains(Self::attribute(property)?, value.as_str())
            }
            Predicate::Goe { property, value } => Filter::GreaterThanOrEquals {
                attribute: Self::attribute(property)?.to_string(),
                value: Self::single_value(property, value)?,
            },
            Predicate::Loe { property, value } => Filter::LessThanOrEquals {
                attribute: Self::attribute(property)?.to_string(),
                value: Self::single_value(property, value)?,
            },
            Predicate::Gt { property, value } => Filter::GreaterThan {
                attribute: Self::attribute(property)?.to_string(),
                value: Self::single_value(property, value)?,
            },
            Predicate::Lt { property, value } => Filter::LessThan {
                attribute: Self::attribute(property)?.to_string(),
                value: Self::single_value(property, value)?,
            },
            Predicate::IsNull { property } => {
                Filter::negate(Filter::present(Self::attribute(property)?))
            }
            Predicate::IsNotNull { property } => Filter::present(Self::attribute(property)?),
            Predicate::In { property, values } => {
                let attribute = Self::attribute(property)?;
                let mut filters = values
                    .iter()
                    .map(|v| Ok(Filter::eq(attribute, Self::single_value(property, v)?)))
                    .collect::<DirectoryResult<Vec<_>>>()?;
                match filters.len() {
                    0 => {
                        return Err(DirectoryError::invalid_argument(format!(
                            "empty value list for '{property}'"
                        )))
                    }
                    1 => filters.remove(0),
                    _ => Filter::or(filters),
                }
            }
            Predicate::And(predicates) => Filter::and(self.translate_all(predicates, "AND")?),
            Predicate::Or(predicates) => Filter::or(self.translate_all(predicates, "OR")?),
            Predicate::Not(inner) => Filter::negate(self.translate(inner)?),
        };
        Ok(filter)
    }
}
