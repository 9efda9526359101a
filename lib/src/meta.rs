use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::value::{Dict, Value};
use crate::dict;
use crate::util::split_trim;

/// A string-keyed bag of loosely typed values attached to every node of the
/// content graph.
///
/// Top-level keys are always lower case. Typed accessors coerce and never
/// fail: a missing or unconvertible value reads as the type's zero value.
/// Cloning yields an independent copy; see [`Value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Dict", into = "Dict")]
pub struct Meta {
    map: Dict,
}

impl Meta {
    pub fn new() -> Self {
        Meta::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (&**k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|k| &**k)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.map.get(key) {
            Some(value) => Some(value),
            None => self.map.get(&*key.to_lowercase()),
        }
    }

    /// Follows `path` through nested dicts. The first segment is matched
    /// case-insensitively like [`Meta::get()`]; the rest are matched exactly.
    pub fn lookup_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.get(first.as_ref())?, |value, segment| {
            value.as_dict()?.get(segment.as_ref())
        })
    }

    /// Like [`Meta::lookup_path()`] with a `.`-separated `key`.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.lookup_path(split_trim(key, ".").as_slice())
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).map(|v| v.cast_int()).unwrap_or(0)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|v| v.cast_bool()).unwrap_or(false)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(|v| v.cast_string()).unwrap_or_default()
    }

    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.get(key).map(|v| v.cast_string_slice()).unwrap_or_default()
    }

    /// The dict at `key` as its own `Meta`, or an empty one.
    pub fn get_string_map(&self, key: &str) -> Meta {
        match self.get(key) {
            Some(Value::Dict(dict)) => Meta::from((**dict).clone()),
            _ => Meta::new(),
        }
    }

    /// Stores `value` at `key`, replacing any previous value.
    pub fn insert<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.map.insert(key.to_lowercase().into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(&*key.to_lowercase())
    }

    /// Sets `key` from an untyped string, coercing it with [`Value::parse()`].
    ///
    /// A dotted key such as `a.b.c` builds nested dicts and merges them into
    /// whatever is already stored under `a`.
    ///
    /// ```
    /// use snowdrift::Meta;
    ///
    /// let mut meta = Meta::new();
    /// meta.set("Weight", "3");
    /// meta.set("site.menu.home", "/");
    /// meta.set("site.title", "Snow");
    ///
    /// assert_eq!(meta.get_int("weight"), 3);
    /// assert_eq!(meta.lookup("site.menu.home").unwrap().as_str(), Some("/"));
    /// assert_eq!(meta.lookup("site.title").unwrap().as_str(), Some("Snow"));
    /// ```
    pub fn set(&mut self, key: &str, raw: &str) {
        let key = key.to_lowercase();
        let segments = split_trim(&key, ".");
        let Some((first, rest)) = segments.split_first() else {
            return;
        };

        let value = rest.iter().rev().fold(Value::parse(raw), |inner, segment| {
            Value::from(dict! { *segment => inner })
        });

        self.merge_key(first, value);
    }

    /// Overwrites this metadata's top-level keys with those in `other`.
    pub fn load(&mut self, other: &Meta) {
        for (key, value) in &other.map {
            self.map.insert(key.clone(), value.clone());
        }
    }

    /// Merges `other` into this metadata with [`Value::merge()`] semantics.
    pub fn merge(&mut self, other: &Meta) {
        for (key, value) in &other.map {
            self.merge_key(key, value.clone());
        }
    }

    fn merge_key(&mut self, key: &str, value: Value) {
        let merged = match self.map.remove(key) {
            Some(old) => old.merge(value),
            None => value,
        };

        self.map.insert(key.into(), merged);
    }
}

impl From<Dict> for Meta {
    fn from(dict: Dict) -> Self {
        let map = dict.into_iter()
            .map(|(k, v)| match k.chars().any(|c| c.is_uppercase()) {
                true => (Arc::from(k.to_lowercase()), v),
                false => (k, v),
            })
            .collect();

        Meta { map }
    }
}

impl From<Meta> for Dict {
    fn from(meta: Meta) -> Self {
        meta.map
    }
}

impl From<Meta> for Value {
    fn from(meta: Meta) -> Self {
        Value::from(meta.map)
    }
}

impl<'a> IntoIterator for &'a Meta {
    type Item = (&'a Arc<str>, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, Arc<str>, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
