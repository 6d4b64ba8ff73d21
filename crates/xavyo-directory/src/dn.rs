//! Distinguished names
//!
//! Parsed RFC 4514 names used as entity identifiers. The leftmost RDN is the
//! most specific one; comparison ignores case in both attribute types and
//! values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{DirectoryError, DirectoryResult};

/// A single relative distinguished name (`attribute=value`).
#[derive(Debug, Clone)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Create an RDN from an attribute type and an unescaped value.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Get the attribute type (e.g. `cn`).
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Get the unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn matches(&self, other: &Rdn) -> bool {
        self.attribute.eq_ignore_ascii_case(&other.attribute)
            && self.value.to_lowercase() == other.value.to_lowercase()
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for Rdn {}

impl Hash for Rdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attribute.to_ascii_lowercase().hash(state);
        self.value.to_lowercase().hash(state);
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape_dn_value(&self.value))
    }
}

/// Distinguished name of a directory entry.
///
/// The empty name is the root DSE; it is valid as a search base but never as
/// an entity identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The empty (root) name.
    pub fn root() -> Self {
        Self { rdns: Vec::new() }
    }

    /// Build a name from RDNs, most specific first.
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self { rdns }
    }

    /// Parse an RFC 4514 string.
    ///
    /// Unescaped spaces around types and values are ignored. Multi-valued
    /// RDNs (`cn=a+uid=b`) are rejected.
    pub fn parse(input: &str) -> DirectoryResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let invalid = |reason: &str| {
            DirectoryError::invalid_argument(format!("invalid DN '{input}': {reason}"))
        };

        let mut rdns = Vec::new();
        let mut chars = trimmed.chars();

        loop {
            let mut attribute = String::new();
            loop {
                match chars.next() {
                    Some('=') => break,
                    Some(',' | '+' | '\\') | None => {
                        return Err(invalid("expected 'attribute=value'"));
                    }
                    Some(c) => attribute.push(c),
                }
            }
            let attribute = attribute.trim();
            if attribute.is_empty() {
                return Err(invalid("empty attribute type"));
            }

            let mut value: Vec<u8> = Vec::new();
            let mut significant = 0;
            let mut leading = true;
            let mut last = true;
            let mut buf = [0u8; 4];

            loop {
                match chars.next() {
                    None => break,
                    Some(',') => {
                        last = false;
                        break;
                    }
                    Some('+') => return Err(invalid("multi-valued RDNs are not supported")),
                    Some('\\') => {
                        let c = chars.next().ok_or_else(|| invalid("dangling escape"))?;
                        if c.is_ascii_hexdigit() {
                            let lo = chars
                                .next()
                                .filter(char::is_ascii_hexdigit)
                                .ok_or_else(|| invalid("malformed hex escape"))?;
                            let byte = u8::from_str_radix(&format!("{c}{lo}"), 16)
                                .map_err(|_| invalid("malformed hex escape"))?;
                            value.push(byte);
                        } else {
                            value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                        }
                        significant = value.len();
                        leading = false;
                    }
                    Some(' ') if leading => {}
                    Some(c) => {
                        value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                        leading = false;
                        if c != ' ' {
                            significant = value.len();
                        }
                    }
                }
            }

            value.truncate(significant);
            let value =
                String::from_utf8(value).map_err(|_| invalid("value is not valid UTF-8"))?;
            rdns.push(Rdn::new(attribute, value));

            if last {
                break;
            }
        }

        Ok(Self { rdns })
    }

    /// Check if this is the empty (root) name.
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDNs.
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Same as [`Dn::is_root`].
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The most specific RDN.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// All RDNs, most specific first.
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The name one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Self {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// A direct child of this name.
    #[must_use]
    pub fn child(&self, attribute: impl Into<String>, value: impl Into<String>) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(Rdn::new(attribute, value));
        rdns.extend(self.rdns.iter().cloned());
        Self { rdns }
    }

    /// This name placed under `suffix` (e.g. a relative entry base under the
    /// context base).
    #[must_use]
    pub fn append(&self, suffix: &Dn) -> Dn {
        let mut rdns = self.rdns.clone();
        rdns.extend(suffix.rdns.iter().cloned());
        Self { rdns }
    }

    /// Check if this name ends with `suffix` (a name always ends with itself
    /// and with the root).
    pub fn ends_with(&self, suffix: &Dn) -> bool {
        if suffix.len() > self.len() {
            return false;
        }
        let offset = self.len() - suffix.len();
        self.rdns[offset..]
            .iter()
            .zip(&suffix.rdns)
            .all(|(a, b)| a.matches(b))
    }

    /// Check if this name is strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        self.len() > ancestor.len() && self.ends_with(ancestor)
    }

    /// Remove `suffix`, returning the relative part.
    pub fn strip_suffix(&self, suffix: &Dn) -> Option<Dn> {
        if !self.ends_with(suffix) {
            return None;
        }
        Some(Self {
            rdns: self.rdns[..self.len() - suffix.len()].to_vec(),
        })
    }

    /// Lower-cased form used for comparisons and as a storage key.
    pub fn normalized(&self) -> String {
        self.rdns
            .iter()
            .map(|rdn| {
                format!(
                    "{}={}",
                    rdn.attribute.to_ascii_lowercase(),
                    escape_dn_value(&rdn.value.to_lowercase())
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Dn {
    type Error = DirectoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Dn {
    type Error = DirectoryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Dn> for String {
    fn from(dn: Dn) -> Self {
        dn.to_string()
    }
}

/// Escape special characters in DN attribute values per RFC 4514.
///
/// Characters that must be escaped:
/// - Leading or trailing SPACE (escaped as \20)
/// - Leading # (escaped as \23)
/// - Characters: , + " \ < > ; = (escaped with backslash prefix)
/// - NUL character (escaped as \00)
pub fn escape_dn_value(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i == count - 1;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let dn = Dn::parse("cn=John Doe,ou=people,dc=example,dc=com").unwrap();
        assert_eq!(dn.len(), 4);
        assert_eq!(dn.rdn().unwrap().attribute(), "cn");
        assert_eq!(dn.rdn().unwrap().value(), "John Doe");
        assert_eq!(dn.to_string(), "cn=John Doe,ou=people,dc=example,dc=com");
    }

    #[test]
    fn test_parse_ignores_spaces_around_components() {
        let dn = Dn::parse(" cn = John , dc=example ").unwrap();
        assert_eq!(dn.to_string(), "cn=John,dc=example");
    }

    #[test]
    fn test_parse_escapes() {
        let dn = Dn::parse(r"cn=Doe\, John,dc=example").unwrap();
        assert_eq!(dn.rdn().unwrap().value(), "Doe, John");

        let dn = Dn::parse(r"cn=Doe\2C John,dc=example").unwrap();
        assert_eq!(dn.rdn().unwrap().value(), "Doe, John");

        let dn = Dn::parse(r"cn=\20padded\20,dc=example").unwrap();
        assert_eq!(dn.rdn().unwrap().value(), " padded ");
    }

    #[test]
    fn test_parse_utf8_hex_escape() {
        let dn = Dn::parse(r"cn=J\C3\BCrgen,dc=example").unwrap();
        assert_eq!(dn.rdn().unwrap().value(), "Jürgen");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Dn::parse("cn").is_err());
        assert!(Dn::parse("=value").is_err());
        assert!(Dn::parse(r"cn=bad\").is_err());
        assert!(Dn::parse(r"cn=bad\4").is_err());
        assert!(Dn::parse("cn=a+uid=b,dc=example").is_err());
    }

    #[test]
    fn test_root() {
        let dn = Dn::parse("").unwrap();
        assert!(dn.is_root());
        assert_eq!(dn.to_string(), "");
        assert!(dn.parent().is_none());
    }

    #[test]
    fn test_equality_ignores_case() {
        let a = Dn::parse("CN=John,DC=Example,DC=com").unwrap();
        let b = Dn::parse("cn=john,dc=example,dc=com").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.normalized(), b.normalized());

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_hierarchy() {
        let base = Dn::parse("dc=example,dc=com").unwrap();
        let people = Dn::parse("ou=people").unwrap().append(&base);
        let john = people.child("cn", "John");

        assert_eq!(john.to_string(), "cn=John,ou=people,dc=example,dc=com");
        assert_eq!(john.parent().unwrap(), people);
        assert!(john.is_descendant_of(&base));
        assert!(john.is_descendant_of(&people));
        assert!(!people.is_descendant_of(&people));
        assert!(people.ends_with(&people));
        assert!(john.ends_with(&Dn::root()));
        assert_eq!(
            john.strip_suffix(&base).unwrap().to_string(),
            "cn=John,ou=people"
        );
        assert!(base.strip_suffix(&john).is_none());
    }

    #[test]
    fn test_display_escapes_values() {
        let dn = Dn::root().child("cn", "Doe, John");
        assert_eq!(dn.to_string(), r"cn=Doe\, John");
        assert_eq!(Dn::parse(&dn.to_string()).unwrap(), dn);
    }

    #[test]
    fn test_escape_dn_value_simple() {
        assert_eq!(escape_dn_value("John Doe"), "John Doe");
        assert_eq!(escape_dn_value(""), "");
    }

    #[test]
    fn test_escape_dn_value_special_chars() {
        assert_eq!(escape_dn_value("a,b"), r"a\,b");
        assert_eq!(escape_dn_value("a+b"), r"a\+b");
        assert_eq!(escape_dn_value("a=b"), r"a\=b");
        assert_eq!(escape_dn_value(r"a\b"), r"a\\b");
        assert_eq!(escape_dn_value("a\0b"), r"a\00b");
    }

    #[test]
    fn test_escape_dn_value_leading_trailing() {
        assert_eq!(escape_dn_value(" lead"), r"\20lead");
        assert_eq!(escape_dn_value("trail "), r"trail\20");
        assert_eq!(escape_dn_value("#hash"), r"\23hash");
        assert_eq!(escape_dn_value("in#side"), "in#side");
        assert_eq!(escape_dn_value("ü "), r"ü\20");
    }

    #[test]
    fn test_escape_dn_value_injection_attempt() {
        let escaped = escape_dn_value("admin,dc=evil,dc=com");
        let dn = Dn::parse(&format!("cn={escaped},dc=example")).unwrap();
        assert_eq!(dn.len(), 2);
        assert_eq!(dn.rdn().unwrap().value(), "admin,dc=evil,dc=com");
    }

    #[test]
    fn test_serde_as_string() {
        let dn = Dn::parse("cn=John,dc=example").unwrap();
        let json = serde_json::to_string(&dn).unwrap();
        assert_eq!(json, "\"cn=John,dc=example\"");
        let parsed: Dn = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, dn);
        assert!(serde_json::from_str::<Dn>("\"not a dn\"").is_err());
    }
}
