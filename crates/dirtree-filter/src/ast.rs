//! Filter syntax tree and its text form.

use std::fmt;
use std::str::FromStr;

use dirtree_entry::Value;

use crate::error::FilterError;
use crate::parser::parse_filter;

/// `attribute <op> value` for the simple comparison filters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assertion {
    pub attribute: String,
    pub value: Value,
}

impl Assertion {
    pub fn new(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// `attribute=initial*any*...*final`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Substrings {
    pub attribute: String,
    pub initial: Option<Value>,
    pub any: Vec<Value>,
    pub final_: Option<Value>,
}

/// `[attribute][:dn][:rule]:=value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extensible {
    pub attribute: Option<String>,
    pub dn_attributes: bool,
    pub matching_rule: Option<String>,
    pub value: Value,
}

/// A parsed search filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality(Assertion),
    Approx(Assertion),
    GreaterOrEqual(Assertion),
    LessOrEqual(Assertion),
    Present(String),
    Substrings(Substrings),
    Extensible(Extensible),
}

impl Filter {
    /// `(attribute=value)`.
    pub fn equality(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equality(Assertion::new(attribute, value))
    }

    /// `(attribute=*)`.
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present(attribute.into())
    }

    /// `(!filter)`.
    pub fn negate(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_filter(s)
    }
}

/// Write `value` with `*`, `(`, `)`, `\` and NUL escaped as `\xx`.
///
/// Bytes that do not form valid UTF-8 are escaped as well, so the result is
/// always text.
pub(crate) fn write_escaped(f: &mut impl fmt::Write, value: &Value) -> fmt::Result {
    let escape = |f: &mut dyn fmt::Write, b: u8| write!(f, "\\{}", hex::encode([b]));
    match value.as_str() {
        Some(text) => {
            for ch in text.chars() {
                match ch {
                    '*' | '(' | ')' | '\\' | '\0' => escape(f, ch as u8)?,
                    c => f.write_char(c)?,
                }
            }
        }
        None => {
            for &b in value.as_bytes() {
                match b {
                    b'*' | b'(' | b')' | b'\\' | 0 | 128.. => escape(f, b)?,
                    b => f.write_char(b as char)?,
                }
            }
        }
    }
    Ok(())
}

fn write_assertion(f: &mut fmt::Formatter<'_>, a: &Assertion, op: &str) -> fmt::Result {
    write!(f, "({}{}", a.attribute, op)?;
    write_escaped(f, &a.value)?;
    f.write_str(")")
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) | Filter::Or(filters) => {
                f.write_str(if matches!(self, Filter::And(_)) { "(&" } else { "(|" })?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                f.write_str(")")
            }
            Filter::Not(filter) => write!(f, "(!{filter})"),
            Filter::Equality(a) => write_assertion(f, a, "="),
            Filter::Approx(a) => write_assertion(f, a, "~="),
            Filter::GreaterOrEqual(a) => write_assertion(f, a, ">="),
            Filter::LessOrEqual(a) => write_assertion(f, a, "<="),
            Filter::Present(attribute) => write!(f, "({attribute}=*)"),
            Filter::Substrings(s) => {
                write!(f, "({}=", s.attribute)?;
                if let Some(initial) = &s.initial {
                    write_escaped(f, initial)?;
                }
                f.write_str("*")?;
                for any in &s.any {
                    write_escaped(f, any)?;
                    f.write_str("*")?;
                }
                if let Some(final_) = &s.final_ {
                    write_escaped(f, final_)?;
                }
                f.write_str(")")
            }
            Filter::Extensible(e) => {
                f.write_str("(")?;
                if let Some(attribute) = &e.attribute {
                    f.write_str(attribute)?;
                }
                if e.dn_attributes {
                    f.write_str(":dn")?;
                }
                if let Some(rule) = &e.matching_rule {
                    write!(f, ":{rule}")?;
                }
                f.write_str(":=")?;
                write_escaped(f, &e.value)?;
                f.write_str(")")
            }
        }
    }
}
