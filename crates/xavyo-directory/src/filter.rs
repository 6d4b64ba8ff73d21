//! Native search filters
//!
//! A structured filter that renders to an RFC 4515 string and can be
//! evaluated against an attribute set.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::entry::{AttributeSet, AttributeValue, OBJECT_CLASS_ATTRIBUTE};

/// Filter for search operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Match objects where attribute equals value.
    Equals { attribute: String, value: String },

    /// Match objects where attribute contains value (substring).
    Contains { attribute: String, value: String },

    /// Match objects where attribute starts with value.
    StartsWith { attribute: String, value: String },

    /// Match objects where attribute ends with value.
    EndsWith { attribute: String, value: String },

    /// General substring match: `initial*any*any*final`.
    Substring {
        attribute: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        any: Vec<String>,
        #[serde(default, rename = "final", skip_serializing_if = "Option::is_none")]
        final_: Option<String>,
    },

    /// Match objects where attribute is greater than value.
    GreaterThan { attribute: String, value: String },

    /// Match objects where attribute is greater than or equal to value.
    GreaterThanOrEquals { attribute: String, value: String },

    /// Match objects where attribute is less than value.
    LessThan { attribute: String, value: String },

    /// Match objects where attribute is less than or equal to value.
    LessThanOrEquals { attribute: String, value: String },

    /// Match objects where attribute exists (has any value).
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },

    /// Logical OR of multiple filters.
    Or { filters: Vec<Filter> },

    /// Logical NOT of a filter.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a contains filter.
    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a starts-with filter.
    pub fn starts_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::StartsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an ends-with filter.
    pub fn ends_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EndsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a substring filter from a wildcard pattern where `*` matches
    /// any run of characters.
    pub fn wildcard(attribute: impl Into<String>, pattern: &str) -> Self {
        Self::pattern(attribute, pattern, '*')
    }

    /// Create a substring filter from a pattern where `wildcard` matches any
    /// run of characters. Every other character, `*` included, is literal.
    pub fn pattern(attribute: impl Into<String>, pattern: &str, wildcard: char) -> Self {
        let attribute = attribute.into();
        if !pattern.contains(wildcard) {
            return Filter::eq(attribute, pattern);
        }
        let mut parts: Vec<String> = pattern.split(wildcard).map(str::to_string).collect();
        let final_ = parts.pop().filter(|s| !s.is_empty());
        let initial = if parts.is_empty() {
            None
        } else {
            Some(parts.remove(0)).filter(|s| !s.is_empty())
        };
        let any = parts.into_iter().filter(|s| !s.is_empty()).collect();
        Filter::Substring {
            attribute,
            initial,
            any,
            final_,
        }
    }

    /// Create a present (attribute exists) filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// A filter matching every entry.
    pub fn everything() -> Self {
        Filter::present(OBJECT_CLASS_ATTRIBUTE)
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Combine this filter with another using AND.
    #[must_use]
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }

    /// Combine this filter with another using OR.
    #[must_use]
    pub fn or_with(self, other: Filter) -> Self {
        match self {
            Filter::Or { mut filters } => {
                filters.push(other);
                Filter::Or { filters }
            }
            _ => Filter::Or {
                filters: vec![self, other],
            },
        }
    }

    /// Render as an RFC 4515 filter string.
    pub fn to_ldap_string(&self) -> String {
        match self {
            Filter::And { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap_string).collect();
                format!("(&{})", inner.join(""))
            }
            Filter::Or { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap_string).collect();
                format!("(|{})", inner.join(""))
            }
            Filter::Not { filter } => format!("(!{})", filter.to_ldap_string()),
            Filter::Equals { attribute, value } => {
                format!("({}={})", attribute, escape_filter_value(value))
            }
            Filter::Contains { attribute, value } => {
                format!("({}=*{}*)", attribute, escape_filter_value(value))
            }
            Filter::StartsWith { attribute, value } => {
                format!("({}={}*)", attribute, escape_filter_value(value))
            }
            Filter::EndsWith { attribute, value } => {
                format!("({}=*{})", attribute, escape_filter_value(value))
            }
            Filter::Substring {
                attribute,
                initial,
                any,
                final_,
            } => {
                let mut pattern = initial.as_deref().map(escape_filter_value).unwrap_or_default();
                pattern.push('*');
                for part in any {
                    pattern.push_str(&escape_filter_value(part));
                    pattern.push('*');
                }
                if let Some(last) = final_ {
                    pattern.push_str(&escape_filter_value(last));
                }
                format!("({attribute}={pattern})")
            }
            // LDAP has no strict ordering match: ">" is ">=" without equality.
            Filter::GreaterThan { attribute, value } => {
                let value = escape_filter_value(value);
                format!("(&({attribute}>={value})(!({attribute}={value})))")
            }
            Filter::GreaterThanOrEquals { attribute, value } => {
                format!("({}>={})", attribute, escape_filter_value(value))
            }
            Filter::LessThan { attribute, value } => {
                let value = escape_filter_value(value);
                format!("(&({attribute}<={value})(!({attribute}={value})))")
            }
            Filter::LessThanOrEquals { attribute, value } => {
                format!("({}<={})", attribute, escape_filter_value(value))
            }
            Filter::Present { attribute } => format!("({attribute}=*)"),
        }
    }

    /// Evaluate this filter against an attribute set.
    ///
    /// String matching ignores case; ordering compares integers numerically
    /// when both sides parse as integers and lexically otherwise.
    pub fn matches(&self, attributes: &AttributeSet) -> bool {
        match self {
            Filter::And { filters } => filters.iter().all(|f| f.matches(attributes)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(attributes)),
            Filter::Not { filter } => !filter.matches(attributes),
            Filter::Present { attribute } => attributes
                .get(attribute)
                .is_some_and(|v| !v.to_strings().is_empty()),
            Filter::Equals { attribute, value } => {
                let expected = value.to_lowercase();
                any_value(attributes, attribute, |v| v.to_lowercase() == expected)
            }
            Filter::Contains { attribute, value } => {
                let needle = value.to_lowercase();
                any_value(attributes, attribute, |v| v.to_lowercase().contains(&needle))
            }
            Filter::StartsWith { attribute, value } => {
                let needle = value.to_lowercase();
                any_value(attributes, attribute, |v| v.to_lowercase().starts_with(&needle))
            }
            Filter::EndsWith { attribute, value } => {
                let needle = value.to_lowercase();
                any_value(attributes, attribute, |v| v.to_lowercase().ends_with(&needle))
            }
            Filter::Substring {
                attribute,
                initial,
                any,
                final_,
            } => any_value(attributes, attribute, |v| {
                substring_matches(&v.to_lowercase(), initial.as_deref(), any, final_.as_deref())
            }),
            Filter::GreaterThan { attribute, value } => any_value(attributes, attribute, |v| {
                compare_values(v, value) == Ordering::Greater
            }),
            Filter::GreaterThanOrEquals { attribute, value } => {
                any_value(attributes, attribute, |v| {
                    compare_values(v, value) != Ordering::Less
                })
            }
            Filter::LessThan { attribute, value } => any_value(attributes, attribute, |v| {
                compare_values(v, value) == Ordering::Less
            }),
            Filter::LessThanOrEquals { attribute, value } => {
                any_value(attributes, attribute, |v| {
                    compare_values(v, value) != Ordering::Greater
                })
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldap_string())
    }
}

fn any_value(attributes: &AttributeSet, attribute: &str, pred: impl Fn(&str) -> bool) -> bool {
    attributes
        .get(attribute)
        .map(AttributeValue::to_strings)
        .is_some_and(|values| values.iter().any(|v| pred(v)))
}

fn substring_matches(
    value: &str,
    initial: Option<&str>,
    any: &[String],
    final_: Option<&str>,
) -> bool {
    let mut rest = value;
    if let Some(initial) = initial {
        let initial = initial.to_lowercase();
        match rest.strip_prefix(initial.as_str()) {
            Some(r) => rest = r,
            None => return false,
        }
    }
    for part in any {
        let part = part.to_lowercase();
        match rest.find(part.as_str()) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    match final_ {
        Some(final_) => rest.ends_with(final_.to_lowercase().as_str()),
        None => true,
    }
}

fn compare_values(left: &str, right: &str) -> Ordering {
    match (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        _ => left.to_lowercase().cmp(&right.to_lowercase()),
    }
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}
