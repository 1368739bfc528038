//! Distinguished names for the dirtree directory engine.
//!
//! A distinguished name ([`Dn`]) is the identity of a node in a directory
//! tree: a sequence of relative distinguished names ([`Rdn`]), most specific
//! first. Each RDN holds one or more attribute-type/value pairs ([`Ava`]),
//! joined with `+` in text form.
//!
//! # Comparison policy
//!
//! Attribute types are compared ignoring ASCII case, values are compared
//! exactly. `cn=Foo,dc=example` equals `CN=Foo,DC=example` but not
//! `cn=foo,dc=example`. Equality, hashing, ordering and [`Dn::contains`] all
//! follow this rule; the original spelling is kept for output.
//!
//! # Modules
//!
//! - [`error`] -- [`NameError`] and the [`NameResult`] alias
//! - [`rdn`] -- [`Ava`] and [`Rdn`], RFC 2253 value escaping
//! - [`dn`] -- [`Dn`] and the text parser

pub mod dn;
pub mod error;
pub mod rdn;

pub use dn::Dn;
pub use error::{NameError, NameResult};
pub use rdn::{escape_value, Ava, Rdn};
