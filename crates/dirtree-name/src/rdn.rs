//! Relative distinguished names and their attribute-type/value pairs.
//!
//! Text output follows RFC 2253 escaping:
//! - a leading space or `#` and a trailing space are escaped with `\`
//! - the characters `,+"\<>;` are escaped with `\` anywhere
//! - control characters (code point <= 31) are written as `\XX`

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::dn::Dn;
use crate::error::{NameError, NameResult};

/// Characters escaped with a backslash wherever they appear in a value.
const SPECIAL_CHARS: &[char] = &[',', '+', '"', '\\', '<', '>', ';'];

/// One `attributeType=value` pair.
#[derive(Clone, Debug)]
pub struct Ava {
    attribute_type: String,
    value: String,
}

impl Ava {
    /// Create a pair from an attribute type and an unescaped value.
    pub fn new(attribute_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_type: attribute_type.into(),
            value: value.into(),
        }
    }

    /// The attribute type, in its original spelling.
    pub fn attribute_type(&self) -> &str {
        &self.attribute_type
    }

    /// The unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn type_cmp(&self, other: &Self) -> Ordering {
        let a = self.attribute_type.bytes().map(|b| b.to_ascii_lowercase());
        let b = other.attribute_type.bytes().map(|b| b.to_ascii_lowercase());
        a.cmp(b)
    }
}

impl PartialEq for Ava {
    fn eq(&self, other: &Self) -> bool {
        self.attribute_type.eq_ignore_ascii_case(&other.attribute_type) && self.value == other.value
    }
}

impl Eq for Ava {}

impl Hash for Ava {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.attribute_type.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(b'=');
        self.value.hash(state);
    }
}

impl PartialOrd for Ava {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ava {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_cmp(other).then_with(|| self.value.cmp(&other.value))
    }
}

impl fmt::Display for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute_type, escape_value(&self.value))
    }
}

/// Escape a value for use inside a distinguished name.
///
/// ```
/// use dirtree_name::escape_value;
///
/// assert_eq!(escape_value("Smith, John"), "Smith\\, John");
/// assert_eq!(escape_value(" padded "), "\\ padded\\ ");
/// assert_eq!(escape_value("#tag"), "\\#tag");
/// ```
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, ch) in value.char_indices() {
        let first = i == 0;
        let last = i + ch.len_utf8() == value.len();
        match ch {
            c if SPECIAL_CHARS.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            ' ' if first || last => out.push_str("\\ "),
            '#' if first => out.push_str("\\#"),
            c if (c as u32) <= 31 => {
                out.push('\\');
                out.push_str(&hex::encode_upper([c as u8]));
            }
            c => out.push(c),
        }
    }
    out
}

/// A relative distinguished name: one path segment of a [`Dn`].
///
/// Holds one or more [`Ava`]s in their written order. Multi-valued RDNs
/// compare structurally, so `cn=a+sn=b` and `sn=b+cn=a` are different.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rdn(Vec<Ava>);

impl Rdn {
    /// Build an RDN from its components.
    ///
    /// Fails if `avas` is empty.
    pub fn new(avas: Vec<Ava>) -> NameResult<Self> {
        if avas.is_empty() {
            return Err(NameError::malformed("", "relative name needs at least one component"));
        }
        Ok(Self(avas))
    }

    /// Single-valued RDN shorthand.
    pub fn single(attribute_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self(vec![Ava::new(attribute_type, value)])
    }

    /// The components of this RDN.
    pub fn avas(&self) -> &[Ava] {
        &self.0
    }

    /// Number of components.
    pub fn count(&self) -> usize {
        self.0.len()
    }

    /// The only component, if this RDN is single-valued.
    pub fn as_single(&self) -> Option<&Ava> {
        match self.0.as_slice() {
            [ava] => Some(ava),
            _ => None,
        }
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{ava}")?;
        }
        Ok(())
    }
}

impl FromStr for Rdn {
    type Err = NameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let dn = Dn::parse(s)?;
        match dn.rdns() {
            [rdn] => Ok(rdn.clone()),
            [] => Err(NameError::malformed(s, "empty relative name")),
            _ => Err(NameError::malformed(s, "expected a single relative name")),
        }
    }
}
