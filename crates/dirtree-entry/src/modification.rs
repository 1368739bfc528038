//! Value-level edits to a single attribute of an entry.

use crate::attribute::AttributeSet;
use crate::entry::Entry;
use crate::error::{EntryError, EntryResult};
use crate::line::write_line;
use crate::value::Value;

/// An edit to one attribute of an entry.
///
/// Each variant carries an [`AttributeSet`]: its key names the attribute,
/// its values are the operands. An empty set means "all values" for
/// `Delete` and "no values" for `Replace`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modification {
    /// Merge values into the attribute, creating it if absent.
    Add(AttributeSet),
    /// Remove the listed values, or the whole attribute when none are listed.
    Delete(AttributeSet),
    /// Replace every value, or remove the attribute when none are listed.
    Replace(AttributeSet),
}

impl Modification {
    /// `Add` of `values` to `key`.
    pub fn add<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Add(AttributeSet::with_values(key, values))
    }

    /// `Delete` of specific `values` from `key`.
    pub fn delete<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Delete(AttributeSet::with_values(key, values))
    }

    /// `Delete` of the whole attribute `key`.
    pub fn delete_all(key: impl Into<String>) -> Self {
        Self::Delete(AttributeSet::new(key))
    }

    /// `Replace` of every value of `key` with `values`.
    pub fn replace<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Replace(AttributeSet::with_values(key, values))
    }

    /// The operand set.
    pub fn set(&self) -> &AttributeSet {
        match self {
            Self::Add(set) | Self::Delete(set) | Self::Replace(set) => set,
        }
    }

    /// The attribute type this modification targets.
    pub fn key(&self) -> &str {
        self.set().key()
    }

    /// The LDIF mod-spec keyword: `add`, `delete` or `replace`.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Delete(_) => "delete",
            Self::Replace(_) => "replace",
        }
    }

    /// Apply this modification to `entry`.
    ///
    /// A failing `Delete` leaves the entry untouched.
    pub fn patch(&self, entry: &mut Entry) -> EntryResult<()> {
        match self {
            Self::Add(set) => {
                entry
                    .attributes_mut()
                    .add_values(set.key(), set.iter().cloned());
            }
            Self::Delete(set) => {
                let Some(current) = entry.get(set.key()) else {
                    return Err(EntryError::NoSuchAttribute {
                        key: set.key().to_string(),
                    });
                };
                if set.is_empty() {
                    entry.attributes_mut().remove(set.key());
                    return Ok(());
                }
                if let Some(missing) = set.iter().find(|v| !current.contains(v)) {
                    return Err(EntryError::NoSuchValue {
                        key: set.key().to_string(),
                        value: missing.to_string_lossy(),
                    });
                }
                entry.attributes_mut().remove_values(set.key(), set.iter());
            }
            Self::Replace(set) => {
                entry.attributes_mut().insert(set.clone());
            }
        }
        Ok(())
    }

    /// Render this modification as an LDIF mod-spec block, ending in `-`.
    pub fn as_ldif(&self) -> String {
        let set = self.set();
        let mut out = format!("{}: {}\n", self.keyword(), set.key());
        for value in set {
            write_line(&mut out, set.key(), value.as_bytes());
        }
        out.push_str("-\n");
        out
    }
}
