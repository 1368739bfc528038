//! Entry model for the dirtree directory engine.
//!
//! An [`Entry`] is a distinguished name plus a case-insensitive map of
//! attribute types to [`AttributeSet`]s. Entries are edited with
//! value-level [`Modification`]s; node-level edits against a tree are
//! [`Operation`]s. Both render themselves as LDIF change records.
//!
//! # Key Types
//!
//! - [`Value`] -- one attribute value (bytes; text is its UTF-8 form)
//! - [`AttributeSet`] -- duplicate-free values bound to one attribute type
//! - [`AttributeMap`] -- case-insensitive attribute type -> [`AttributeSet`]
//! - [`Entry`] -- DN + attributes, with [`Entry::diff`]
//! - [`Modification`] -- `Add` / `Delete` / `Replace` on one attribute
//! - [`Operation`] -- [`ModifyOp`] / [`AddOp`] / [`DeleteOp`]

pub mod attribute;
pub mod entry;
pub mod error;
pub mod line;
pub mod map;
pub mod modification;
pub mod operation;
pub mod value;

pub use attribute::AttributeSet;
pub use entry::Entry;
pub use error::{EntryError, EntryResult};
pub use map::AttributeMap;
pub use modification::Modification;
pub use operation::{AddOp, DeleteOp, ModifyOp, Operation};
pub use value::Value;
