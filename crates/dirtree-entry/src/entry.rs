//! Directory entries and entry-level diff.

use std::fmt;

use dirtree_name::Dn;

use crate::attribute::AttributeSet;
use crate::line::write_line;
use crate::map::AttributeMap;
use crate::modification::Modification;
use crate::operation::ModifyOp;
use crate::value::Value;

/// A directory entry: a distinguished name plus its attributes.
///
/// Two entries are equal when their DNs and attribute maps are equal.
/// `Display` renders the canonical LDIF record (see [`Entry::to_ldif`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    dn: Dn,
    attributes: AttributeMap,
}

impl Entry {
    /// An entry with no attributes.
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: AttributeMap::new(),
        }
    }

    /// An entry with the given attributes.
    pub fn with_attributes(dn: Dn, attributes: AttributeMap) -> Self {
        Self { dn, attributes }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }

    /// Split into DN and attributes.
    pub fn into_parts(self) -> (Dn, AttributeMap) {
        (self.dn, self.attributes)
    }

    /// The set for `key`, ignoring case.
    pub fn get(&self, key: &str) -> Option<&AttributeSet> {
        self.attributes.get(key)
    }

    /// Returns `true` if the entry has attribute `key`, ignoring case.
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Replace the values of `set.key()` with `set`.
    pub fn insert(&mut self, set: AttributeSet) -> Option<AttributeSet> {
        self.attributes.insert(set)
    }

    /// Merge `values` into attribute `key`.
    pub fn add_values<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.attributes
            .add_values(key, values.into_iter().map(Into::into));
    }

    /// Remove attribute `key` entirely.
    pub fn remove(&mut self, key: &str) -> Option<AttributeSet> {
        self.attributes.remove(key)
    }

    /// A copy holding only the named attributes.
    ///
    /// An empty list or a list containing `*` keeps every attribute.
    pub fn project<S: AsRef<str>>(&self, keys: &[S]) -> Entry {
        if keys.is_empty() || keys.iter().any(|k| k.as_ref() == "*") {
            return self.clone();
        }
        let attributes = self
            .attributes
            .iter()
            .filter(|set| keys.iter().any(|k| k.as_ref().eq_ignore_ascii_case(set.key())))
            .cloned()
            .collect();
        Entry::with_attributes(self.dn.clone(), attributes)
    }

    /// Compute the modifications that turn `self` into `other`.
    ///
    /// Returns `None` when the attributes are already equal. The result is
    /// ordered for reproducibility, not minimality:
    /// 1. an `Add` per attribute only in `other`, by key
    /// 2. a `Delete` per attribute only in `self`, by key
    /// 3. per shared attribute, by key, an `Add` of the values only in
    ///    `other` then a `Delete` of the values only in `self`
    ///
    /// # Panics
    ///
    /// Panics if the two entries have different DNs.
    pub fn diff(&self, other: &Entry) -> Option<ModifyOp> {
        assert_eq!(
            self.dn, other.dn,
            "diff requires entries with the same distinguished name"
        );
        if self.attributes == other.attributes {
            return None;
        }

        let mut added = Vec::new();
        let mut deleted = Vec::new();
        let mut shared = Vec::new();

        for theirs in &other.attributes {
            match self.attributes.get(theirs.key()) {
                Some(ours) => shared.push((ours, theirs)),
                None => added.push(Modification::Add(theirs.clone())),
            }
        }
        for ours in &self.attributes {
            if !other.attributes.contains_key(ours.key()) {
                deleted.push(Modification::Delete(ours.clone()));
            }
        }

        let mut modifications = added;
        modifications.extend(deleted);
        for (ours, theirs) in shared {
            let new_values = theirs.difference(ours);
            if !new_values.is_empty() {
                modifications.push(Modification::Add(new_values));
            }
            let old_values = ours.difference(theirs);
            if !old_values.is_empty() {
                modifications.push(Modification::Delete(old_values));
            }
        }

        Some(ModifyOp::new(self.dn.clone(), modifications))
    }

    /// The attribute lines of the canonical form: `objectClass` values
    /// first, then every other attribute ordered by key, values sorted.
    pub fn attribute_lines(&self) -> String {
        let mut out = String::new();
        if let Some(classes) = self.attributes.get("objectClass") {
            for value in classes {
                write_line(&mut out, classes.key(), value.as_bytes());
            }
        }
        for set in &self.attributes {
            if set.key().eq_ignore_ascii_case("objectClass") {
                continue;
            }
            for value in set {
                write_line(&mut out, set.key(), value.as_bytes());
            }
        }
        out
    }

    /// The canonical LDIF record: `dn:` line, attribute lines, blank line.
    pub fn to_ldif(&self) -> String {
        let mut out = String::new();
        write_line(&mut out, "dn", self.dn.to_string().as_bytes());
        out.push_str(&self.attribute_lines());
        out.push('\n');
        out
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldif())
    }
}
