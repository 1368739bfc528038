//! Distinguished names and the RFC 2253 text parser.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{NameError, NameResult};
use crate::rdn::{Ava, Rdn};

/// Characters that may follow a backslash without forming a hex pair.
const ESCAPABLE: &[u8] = b",+\"\\<>;=# ";

/// A distinguished name: RDNs ordered most specific first.
///
/// The empty DN (no RDNs) names the top of a hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dn(Vec<Rdn>);

impl Dn {
    /// Parse a distinguished name from its text form.
    ///
    /// ```
    /// use dirtree_name::Dn;
    ///
    /// let dn = Dn::parse("cn=Smith\\, John,ou=people,dc=example,dc=com").unwrap();
    /// assert_eq!(dn.len(), 4);
    /// assert_eq!(dn.rdn().unwrap().avas()[0].value(), "Smith, John");
    /// ```
    pub fn parse(text: &str) -> NameResult<Self> {
        Parser::new(text).parse()
    }

    /// Build a DN from RDNs, most specific first.
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self(rdns)
    }

    /// The empty DN.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The RDNs, most specific first.
    pub fn rdns(&self) -> &[Rdn] {
        &self.0
    }

    /// The leading (most specific) RDN.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.0.first()
    }

    /// Number of RDNs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty DN.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parent DN, with the leading RDN removed.
    pub fn up(&self) -> NameResult<Dn> {
        match self.0.split_first() {
            Some((_, rest)) => Ok(Self(rest.to_vec())),
            None => Err(NameError::EmptyDn),
        }
    }

    /// The DN of a child named `rdn` directly below this one.
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.0.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.0.iter().cloned());
        Self(rdns)
    }

    /// Returns `true` if `other` is this DN or lies below it.
    pub fn contains(&self, other: &Dn) -> bool {
        other.0.len() >= self.0.len() && other.0.ends_with(&self.0)
    }

    /// The RDNs of `other` below this DN, most specific first.
    ///
    /// Returns `None` if `other` is not contained by this DN.
    pub fn relative_rdns<'a>(&self, other: &'a Dn) -> Option<&'a [Rdn]> {
        if !self.contains(other) {
            return None;
        }
        Some(&other.0[..other.0.len() - self.0.len()])
    }

    /// Dot-joined domain from a trailing run of single-valued `dc=` RDNs.
    ///
    /// ```
    /// use dirtree_name::Dn;
    ///
    /// let dn = Dn::parse("cn=foo,ou=bar,dc=example,dc=com").unwrap();
    /// assert_eq!(dn.domain_name().as_deref(), Some("example.com"));
    /// assert_eq!(Dn::parse("cn=foo").unwrap().domain_name(), None);
    /// ```
    pub fn domain_name(&self) -> Option<String> {
        let mut parts = Vec::new();
        for rdn in self.0.iter().rev() {
            match rdn.as_single() {
                Some(ava) if ava.attribute_type().eq_ignore_ascii_case("dc") => {
                    parts.push(ava.value());
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            return None;
        }
        parts.reverse();
        Some(parts.join("."))
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Hierarchical order: compared from the least specific RDN, so a parent
/// sorts before its children.
impl Ord for Dn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = NameError;

    fn from_str(s: &str) -> NameResult<Self> {
        Self::parse(s)
    }
}

impl From<Rdn> for Dn {
    fn from(rdn: Rdn) -> Self {
        Self(vec![rdn])
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// How a value ended.
enum Terminator {
    /// `+`: another component of the same RDN follows.
    Plus,
    /// `,` or `;`: the next RDN follows.
    Comma,
    End,
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> NameError {
        NameError::malformed(self.text, reason)
    }

    fn skip_spaces(&mut self) {
        while self.bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> NameResult<Dn> {
        if self.text.trim().is_empty() {
            return Ok(Dn::empty());
        }

        let mut rdns = Vec::new();
        let mut avas = Vec::new();
        loop {
            let attribute_type = self.attribute_type()?;
            let (value, terminator) = self.value()?;
            avas.push(Ava::new(attribute_type, value));
            match terminator {
                Terminator::Plus => continue,
                Terminator::Comma => rdns.push(Rdn::new(std::mem::take(&mut avas))?),
                Terminator::End => {
                    rdns.push(Rdn::new(avas)?);
                    return Ok(Dn(rdns));
                }
            }
        }
    }

    fn attribute_type(&mut self) -> NameResult<String> {
        self.skip_spaces();
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b'=' => break,
                b if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b';' => {
                    self.pos += 1
                }
                b' ' => break,
                _ => {
                    return Err(self.error(format!(
                        "unexpected {:?} in attribute type at offset {}",
                        b as char, self.pos
                    )))
                }
            }
        }
        let attribute_type = &self.text[start..self.pos];
        self.skip_spaces();
        if attribute_type.is_empty() {
            return Err(self.error(format!("missing attribute type at offset {start}")));
        }
        if self.bytes.get(self.pos) != Some(&b'=') {
            return Err(self.error(format!("expected '=' at offset {}", self.pos)));
        }
        self.pos += 1;
        Ok(attribute_type.to_string())
    }

    fn value(&mut self) -> NameResult<(String, Terminator)> {
        self.skip_spaces();
        let mut raw = Vec::new();
        // Length of `raw` up to the last byte that must be kept; unescaped
        // trailing spaces beyond it are dropped.
        let mut keep = 0;
        let mut quoted = false;

        if self.bytes.get(self.pos) == Some(&b'"') {
            quoted = true;
            self.pos += 1;
        }

        let terminator = loop {
            let Some(&b) = self.bytes.get(self.pos) else {
                if quoted {
                    return Err(self.error("unterminated quoted value"));
                }
                break Terminator::End;
            };
            self.pos += 1;
            match b {
                b'\\' => {
                    raw.push(self.escaped()?);
                    keep = raw.len();
                }
                b'"' if quoted => {
                    quoted = false;
                    keep = raw.len();
                    self.skip_spaces();
                }
                _ if quoted => {
                    raw.push(b);
                    keep = raw.len();
                }
                b'+' => break Terminator::Plus,
                b',' | b';' => break Terminator::Comma,
                b'"' | b'<' | b'>' => {
                    return Err(self.error(format!(
                        "unescaped {:?} in value at offset {}",
                        b as char,
                        self.pos - 1
                    )))
                }
                b' ' => raw.push(b),
                _ => {
                    raw.push(b);
                    keep = raw.len();
                }
            }
        };

        raw.truncate(keep);
        let value = String::from_utf8(raw).map_err(|_| self.error("value is not valid UTF-8"))?;
        Ok((value, terminator))
    }

    /// Decode the escape sequence following a backslash.
    fn escaped(&mut self) -> NameResult<u8> {
        let Some(&next) = self.bytes.get(self.pos) else {
            return Err(self.error("dangling escape at end of name"));
        };
        if next.is_ascii_hexdigit() {
            let pair = self
                .bytes
                .get(self.pos..self.pos + 2)
                .ok_or_else(|| self.error(format!("truncated hex escape at offset {}", self.pos)))?;
            let decoded = hex::decode(pair)
                .map_err(|_| self.error(format!("invalid hex escape at offset {}", self.pos)))?;
            self.pos += 2;
            return Ok(decoded[0]);
        }
        if ESCAPABLE.contains(&next) {
            self.pos += 1;
            return Ok(next);
        }
        Err(self.error(format!(
            "invalid escape {:?} at offset {}",
            next as char, self.pos
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parse_simple() {
        let d = dn("cn=foo,dc=example,dc=com");
        assert_eq!(d.len(), 3);
        assert_eq!(d.rdn().unwrap(), &Rdn::single("cn", "foo"));
        assert_eq!(d.to_string(), "cn=foo,dc=example,dc=com");
    }

    #[test]
    fn parse_empty() {
        assert!(dn("").is_empty());
        assert!(dn("   ").is_empty());
        assert_eq!(Dn::empty().to_string(), "");
    }

    #[test]
    fn parse_ignores_spaces_around_separators() {
        assert_eq!(dn("cn = foo , dc=example"), dn("cn=foo,dc=example"));
    }

    #[test]
    fn parse_multi_valued() {
        let d = dn("cn=John+uid=jd,dc=example");
        assert_eq!(d.rdn().unwrap().count(), 2);
        assert_eq!(d.to_string(), "cn=John+uid=jd,dc=example");
    }

    #[test]
    fn parse_escapes() {
        let d = dn("cn=Smith\\, John\\+\\3Cx\\3e,dc=example");
        assert_eq!(d.rdn().unwrap().avas()[0].value(), "Smith, John+<x>");
    }

    #[test]
    fn parse_hex_utf8() {
        let d = dn("cn=Lu\\C4\\8Di\\C4\\87");
        assert_eq!(d.rdn().unwrap().avas()[0].value(), "Lučić");
    }

    #[test]
    fn parse_escaped_boundary_spaces_kept() {
        let d = dn("cn=\\ foo\\ ,dc=x");
        assert_eq!(d.rdn().unwrap().avas()[0].value(), " foo ");
    }

    #[test]
    fn parse_quoted_value() {
        let d = dn("cn=\"a, b\",dc=x");
        assert_eq!(d.rdn().unwrap().avas()[0].value(), "a, b");
    }

    #[test]
    fn parse_semicolon_separator() {
        assert_eq!(dn("cn=a;dc=b"), dn("cn=a,dc=b"));
    }

    #[test]
    fn reject_malformed() {
        assert!(Dn::parse("cn").is_err());
        assert!(Dn::parse("=foo").is_err());
        assert!(Dn::parse("cn=foo,").is_err());
        assert!(Dn::parse("cn=a\\").is_err());
        assert!(Dn::parse("cn=a\\zz").is_err());
        assert!(Dn::parse("cn=\"open").is_err());
        assert!(Dn::parse("cn=a<b").is_err());
        assert!(Dn::parse("cn=\\FF").is_err());
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    #[test]
    fn up_removes_leading_rdn() {
        assert_eq!(dn("cn=foo,dc=example").up().unwrap(), dn("dc=example"));
        assert_eq!(dn("dc=example").up().unwrap(), Dn::empty());
        assert_eq!(Dn::empty().up(), Err(NameError::EmptyDn));
    }

    #[test]
    fn child_prepends() {
        let parent = dn("dc=example");
        assert_eq!(parent.child(Rdn::single("cn", "x")), dn("cn=x,dc=example"));
    }

    #[test]
    fn contains_ancestor_or_self() {
        let base = dn("dc=example,dc=com");
        assert!(base.contains(&dn("cn=foo,ou=people,dc=example,dc=com")));
        assert!(base.contains(&base));
        assert!(!base.contains(&dn("dc=com")));
        assert!(!base.contains(&dn("cn=foo,dc=other,dc=com")));
        assert!(Dn::empty().contains(&base));
    }

    #[test]
    fn relative_rdns_below_base() {
        let base = dn("dc=example");
        let target = dn("cn=a,ou=b,dc=example");
        let rel = base.relative_rdns(&target).unwrap();
        assert_eq!(rel, &[Rdn::single("cn", "a"), Rdn::single("ou", "b")]);
        assert!(base.relative_rdns(&dn("dc=other")).is_none());
    }

    #[test]
    fn domain_name_requires_trailing_dc_run() {
        assert_eq!(dn("dc=example,dc=com").domain_name().as_deref(), Some("example.com"));
        assert_eq!(dn("cn=x,dc=a,ou=b,dc=c").domain_name().as_deref(), Some("c"));
        assert_eq!(dn("dc=a+cn=b,dc=c").domain_name().as_deref(), Some("c"));
        assert_eq!(dn("dc=a,ou=c").domain_name(), None);
    }

    // -----------------------------------------------------------------------
    // Comparison
    // -----------------------------------------------------------------------

    #[test]
    fn attribute_type_case_insensitive() {
        assert_eq!(dn("CN=foo,DC=example"), dn("cn=foo,dc=example"));
        assert_ne!(dn("cn=Foo"), dn("cn=foo"));
        assert!(dn("dc=EXAMPLE").contains(&dn("cn=a,DC=EXAMPLE")));
    }

    #[test]
    fn hierarchical_order() {
        let mut dns = vec![dn("cn=b,dc=x"), dn("dc=x"), dn("cn=a,dc=x")];
        dns.sort();
        assert_eq!(dns, vec![dn("dc=x"), dn("cn=a,dc=x"), dn("cn=b,dc=x")]);
    }

    // -----------------------------------------------------------------------
    // Round trip
    // -----------------------------------------------------------------------

    #[test]
    fn round_trip_special_values() {
        for value in [" lead", "trail ", "#hash", "a,b", "q\"uote", "semi;colon", "ctl\u{1}", "=eq"] {
            let original = Dn::from(Rdn::single("cn", value)).child(Rdn::single("uid", value));
            let parsed = Dn::parse(&original.to_string()).unwrap();
            assert_eq!(parsed, original, "value {value:?}");
        }
    }

    fn ava_strategy() -> impl Strategy<Value = Ava> {
        (
            "[a-zA-Z][a-zA-Z0-9-]{0,8}",
            prop::collection::vec(any::<char>(), 0..12),
        )
            .prop_map(|(t, v)| Ava::new(t, v.into_iter().collect::<String>()))
    }

    proptest! {
        #[test]
        fn text_round_trip(rdns in prop::collection::vec(prop::collection::vec(ava_strategy(), 1..3), 0..5)) {
            let original = Dn::from_rdns(rdns.into_iter().map(|avas| Rdn::new(avas).unwrap()).collect());
            let text = original.to_string();
            let parsed = Dn::parse(&text).unwrap();
            prop_assert_eq!(&parsed, &original);
            prop_assert_eq!(Dn::parse(&parsed.to_string()).unwrap(), parsed);
        }
    }
}
