//! Attribute sets: the values of one attribute type.

use std::collections::btree_set;
use std::collections::BTreeSet;

use crate::value::Value;

/// A duplicate-free set of values bound to one attribute type.
///
/// Insertion order is not significant; iteration yields values in byte
/// order. Two sets are equal when their keys match (ignoring ASCII case)
/// and they hold the same values. Comparing against a plain slice of values
/// ignores the key.
#[derive(Clone, Debug)]
pub struct AttributeSet {
    key: String,
    values: BTreeSet<Value>,
}

impl AttributeSet {
    /// An empty set for `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: BTreeSet::new(),
        }
    }

    /// A set for `key` holding `values`; duplicates collapse.
    pub fn with_values<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The attribute type this set is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over values in byte order.
    pub fn iter(&self) -> btree_set::Iter<'_, Value> {
        self.values.iter()
    }

    /// The smallest value.
    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    /// Returns `true` if `value` is in the set.
    pub fn contains(&self, value: impl AsRef<[u8]>) -> bool {
        self.values.contains(value.as_ref())
    }

    /// Add a value. Returns `false` if it was already present.
    pub fn insert(&mut self, value: impl Into<Value>) -> bool {
        self.values.insert(value.into())
    }

    /// Remove a value. Returns `false` if it was not present.
    pub fn remove(&mut self, value: impl AsRef<[u8]>) -> bool {
        self.values.remove(value.as_ref())
    }

    /// Values in both sets, keeping this set's key.
    pub fn intersection(&self, other: &AttributeSet) -> AttributeSet {
        self.derive(self.values.intersection(&other.values))
    }

    /// Values in either set, keeping this set's key.
    pub fn union(&self, other: &AttributeSet) -> AttributeSet {
        self.derive(self.values.union(&other.values))
    }

    /// Values in this set but not in `other`.
    pub fn difference(&self, other: &AttributeSet) -> AttributeSet {
        self.derive(self.values.difference(&other.values))
    }

    /// Values in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &AttributeSet) -> AttributeSet {
        self.derive(self.values.symmetric_difference(&other.values))
    }

    fn derive<'a>(&self, values: impl Iterator<Item = &'a Value>) -> AttributeSet {
        AttributeSet {
            key: self.key.clone(),
            values: values.cloned().collect(),
        }
    }

    /// Returns `true` if both sets hold the same values, whatever the keys.
    pub fn same_values(&self, other: &AttributeSet) -> bool {
        self.values == other.values
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.key.eq_ignore_ascii_case(&other.key) && self.values == other.values
    }
}

impl Eq for AttributeSet {}

impl<V: AsRef<[u8]>> PartialEq<[V]> for AttributeSet {
    fn eq(&self, other: &[V]) -> bool {
        let other: BTreeSet<&[u8]> = other.iter().map(AsRef::as_ref).collect();
        self.values.len() == other.len() && self.values.iter().all(|v| other.contains(v.as_bytes()))
    }
}

impl<V: AsRef<[u8]>, const N: usize> PartialEq<[V; N]> for AttributeSet {
    fn eq(&self, other: &[V; N]) -> bool {
        *self == other[..]
    }
}

impl<V: AsRef<[u8]>> PartialEq<Vec<V>> for AttributeSet {
    fn eq(&self, other: &Vec<V>) -> bool {
        *self == other[..]
    }
}

// Lets `entry.get(key).unwrap() == [..]` compare without a deref.
impl<V: AsRef<[u8]>, const N: usize> PartialEq<[V; N]> for &AttributeSet {
    fn eq(&self, other: &[V; N]) -> bool {
        **self == other[..]
    }
}

impl<V: AsRef<[u8]>> PartialEq<Vec<V>> for &AttributeSet {
    fn eq(&self, other: &Vec<V>) -> bool {
        **self == other[..]
    }
}

impl Extend<Value> for AttributeSet {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a Value;
    type IntoIter = btree_set::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for AttributeSet {
    type Item = Value;
    type IntoIter = btree_set::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
