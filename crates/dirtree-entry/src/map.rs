//! Case-insensitive mapping from attribute type to [`AttributeSet`].

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::attribute::AttributeSet;
use crate::value::Value;

/// Attribute map keyed by attribute type, ignoring ASCII case.
///
/// Keys are normalized to lowercase for lookup and ordering; each
/// [`AttributeSet`] keeps the spelling it was created with, which is what
/// gets written out. Empty sets are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeMap(BTreeMap<String, AttributeSet>);

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl AttributeMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(key, values)` pairs. Pairs with a repeated key
    /// merge into one set.
    ///
    /// ```
    /// use dirtree_entry::AttributeMap;
    ///
    /// let attrs = AttributeMap::from_pairs([("cn", vec!["foo"]), ("CN", vec!["bar"])]);
    /// assert_eq!(attrs.len(), 1);
    /// assert!(attrs.get("Cn").unwrap() == ["foo", "bar"]);
    /// ```
    pub fn from_pairs<K, I, V>(pairs: impl IntoIterator<Item = (K, I)>) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut map = Self::new();
        for (key, values) in pairs {
            let key = key.into();
            map.add_values(&key, values.into_iter().map(Into::into));
        }
        map
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The set for `key`, ignoring case.
    pub fn get(&self, key: &str) -> Option<&AttributeSet> {
        self.0.get(&normalize(key))
    }

    /// Returns `true` if `key` is present, ignoring case.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(&normalize(key))
    }

    /// Store `set` under its own key, replacing any existing set.
    ///
    /// Storing an empty set removes the key. Returns the previous set.
    pub fn insert(&mut self, set: AttributeSet) -> Option<AttributeSet> {
        let key = normalize(set.key());
        if set.is_empty() {
            return self.0.remove(&key);
        }
        self.0.insert(key, set)
    }

    /// Remove and return the set for `key`.
    pub fn remove(&mut self, key: &str) -> Option<AttributeSet> {
        self.0.remove(&normalize(key))
    }

    /// Merge values into the set for `key`, creating it if needed.
    pub fn add_values(&mut self, key: &str, values: impl IntoIterator<Item = Value>) {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return;
        }
        self.0
            .entry(normalize(key))
            .or_insert_with(|| AttributeSet::new(key))
            .extend(values);
    }

    /// Remove the given values from the set for `key`, dropping the key when
    /// no values remain.
    pub fn remove_values<'a>(&mut self, key: &str, values: impl IntoIterator<Item = &'a Value>) {
        let normalized = normalize(key);
        if let Some(set) = self.0.get_mut(&normalized) {
            for value in values {
                set.remove(value);
            }
            if set.is_empty() {
                self.0.remove(&normalized);
            }
        }
    }

    /// Attribute types in their stored spelling, ordered ignoring case.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(AttributeSet::key)
    }

    /// Sets ordered by attribute type, ignoring case.
    pub fn iter(&self) -> btree_map::Values<'_, String, AttributeSet> {
        self.0.values()
    }
}

impl FromIterator<AttributeSet> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = AttributeSet>>(iter: I) -> Self {
        let mut map = Self::new();
        for set in iter {
            let key = set.key().to_string();
            map.add_values(&key, set);
        }
        map
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = &'a AttributeSet;
    type IntoIter = btree_map::Values<'a, String, AttributeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}

impl IntoIterator for AttributeMap {
    type Item = AttributeSet;
    type IntoIter = btree_map::IntoValues<String, AttributeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}
