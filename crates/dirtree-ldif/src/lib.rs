//! LDIF codec for the dirtree directory engine.
//!
//! LDIF is both the on-disk format of the file-backed tree and the exchange
//! format for diffs. This crate provides:
//!
//! - [`LdifParser`] -- incremental parser for content records
//!   ([`Mode::Entries`]) or change records ([`Mode::Changes`])
//! - [`parse_entries`] / [`parse_changes`] -- one-shot helpers
//! - [`LdifWriter`], [`write_entries`], [`write_changes`] -- serialization
//!
//! ```
//! use dirtree_ldif::{parse_entries, write_entries};
//!
//! let text = "version: 1\n\ndn: cn=foo,dc=example\ncn: foo\n\n";
//! let entries = parse_entries(text).unwrap();
//! assert_eq!(write_entries(&entries), text);
//! ```

pub mod error;
pub mod parser;
pub mod writer;

pub use error::{LdifError, LdifResult};
pub use parser::{parse_changes, parse_entries, LdifParser, LdifRecord, Mode};
pub use writer::{write_changes, write_entries, LdifWriter, VERSION_HEADER};
