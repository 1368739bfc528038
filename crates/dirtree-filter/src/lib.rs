//! Search filters for the dirtree directory engine.
//!
//! Filters follow the RFC 2254 string representation:
//!
//! ```text
//! filter     = "(" filtercomp ")"
//! filtercomp = and / or / not / item
//! and        = "&" 1*filter
//! or         = "|" 1*filter
//! not        = "!" filter
//! item       = simple / present / substring / extensible
//! simple     = attr ("=" / "~=" / ">=" / "<=") value
//! present    = attr "=*"
//! substring  = attr "=" [initial] "*" *(any "*") [final]
//! extensible = attr [":dn"] [":" rule] ":=" value
//!            / [":dn"] ":" rule ":=" value
//! ```
//!
//! Values escape bytes as `\XX`. Comparisons are byte comparisons; there is
//! no attribute-syntax awareness.
//!
//! ```
//! use dirtree_entry::{AttributeMap, Entry};
//! use dirtree_filter::parse_filter;
//! use dirtree_name::Dn;
//!
//! let filter = parse_filter("(&(objectClass=person)(cn=foo*))").unwrap();
//! let entry = Entry::with_attributes(
//!     Dn::parse("cn=foobar,dc=example").unwrap(),
//!     AttributeMap::from_pairs([("objectClass", vec!["person"]), ("cn", vec!["foobar"])]),
//! );
//! assert!(filter.matches(&entry));
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;

pub use ast::{Assertion, Extensible, Filter, Substrings};
pub use error::{FilterError, FilterResult};
pub use eval::evaluate;
pub use parser::{parse_filter, parse_maybe_substring};
