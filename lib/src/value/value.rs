use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::{fmt, sync::Arc};

use serde::Serialize;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

pub type Dict<K = Arc<str>, V = Value> = BTreeMap<K, V>;

/// Represents any metadata value.
///
/// Compound values are reference counted and never mutated in place, so
/// cloning a value (or a [`Dict`] of them) is cheap and yields a fully
/// independent copy: a write to one clone replaces nodes along the written
/// path and leaves every other clone untouched.
#[derive(Debug, Default, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Dict(Arc<Dict>),
}

impl Value {
    /// Parses a raw, untyped string the way header lines are parsed: a
    /// bracketed `[a, b]` list, then an integer, then a boolean, else the
    /// trimmed string itself.
    pub fn parse(raw: &str) -> Value {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return crate::util::split_trim(inner, ",")
                .into_iter()
                .map(Value::from)
                .collect();
        }

        if let Ok(int) = raw.parse::<i64>() {
            return Value::Int(int);
        }

        match parse_bool(raw) {
            Some(b) => Value::Bool(b),
            None => Value::from(raw),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None
        }
    }

    pub fn to_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(v) => Some(&**v),
            _ => None
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }

    /// Lossy conversion to a string. Compound values become `""`.
    pub fn cast_string(&self) -> String {
        match self {
            Value::Null | Value::Array(_) | Value::Dict(_) => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.to_string(),
        }
    }

    /// Lossy conversion to an integer. Anything unconvertible becomes `0`.
    pub fn cast_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::Float(f) => *f as i64,
            Value::Bool(b) => *b as i64,
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Lossy conversion to a boolean. Anything unconvertible becomes `false`.
    pub fn cast_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => parse_bool(s.trim()).unwrap_or(false),
            _ => false,
        }
    }

    /// Lossy conversion to a list of strings. A string is split on
    /// whitespace; other scalars become an empty list.
    pub fn cast_string_slice(&self) -> Vec<String> {
        match self {
            Value::Array(items) => items.iter().map(|v| v.cast_string()).collect(),
            Value::String(s) => s.split_whitespace().map(String::from).collect(),
            _ => vec![],
        }
    }

    /// Merges `new` on top of `self`.
    ///
    /// Two dicts merge key by key, recursively. Two arrays concatenate.
    /// Otherwise `new` replaces `self`.
    pub fn merge(self, new: Value) -> Value {
        match (self, new) {
            (Value::Dict(old), Value::Dict(new)) => {
                let mut merged = Arc::unwrap_or_clone(old);
                for (key, value) in new.iter() {
                    let value = match merged.remove(key) {
                        Some(old) => old.merge(value.clone()),
                        None => value.clone(),
                    };

                    merged.insert(key.clone(), value);
                }

                Value::Dict(Arc::new(merged))
            }
            (Value::Array(old), Value::Array(new)) => {
                old.iter().chain(new.iter()).cloned().collect()
            }
            (_, new) => new,
        }
    }

    /// Orders two values for sorting: numerically when both are numbers,
    /// by their string forms when both are scalars, and as equal otherwise.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let (a, b) = (self.to_float(), other.to_float());
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Value::Null | Value::Array(_) | Value::Dict(_), _) => Ordering::Equal,
            (_, Value::Null | Value::Array(_) | Value::Dict(_)) => Ordering::Equal,
            (a, b) => a.cast_string().cmp(&b.cast_string()),
        }
    }
}

fn parse_bool(string: &str) -> Option<bool> {
    match string {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cast_string().fmt(f)
    }
}

macro_rules! impl_from_primitive {
    ($($T:ty),+ => $E:ident::$kind:ident) => {
        $(
            impl From<$T> for $E {
                fn from(value: $T) -> Self {
                    $E::$kind(value.into())
                }
            }
        )+
    };
}

impl_from_primitive!(bool => Value::Bool);
impl_from_primitive!(&str => Value::String);
impl_from_primitive!(String => Value::String);
impl_from_primitive!(Arc<str> => Value::String);
impl_from_primitive!(Arc<Vec<Value>> => Value::Array);
impl_from_primitive!(Arc<Dict> => Value::Dict);
impl_from_primitive!(u8, u16, u32, i8, i16, i32, i64 => Value::Int);
impl_from_primitive!(f32, f64 => Value::Float);

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value).map(Value::Int).unwrap_or(Value::Float(value as f64))
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T> From<Option<T>> for Value where Value: From<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

impl<T> From<Vec<T>> for Value where Value: From<T> {
    fn from(value: Vec<T>) -> Self {
        value.into_iter()
            .map(Value::from)
            .collect()
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Value::Dict(Arc::new(value))
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let vec = iter.into_iter().collect::<Vec<Value>>();
        Value::Array(Arc::new(vec))
    }
}

/// The key TOML uses to smuggle date-times through serde.
const TOML_DATETIME: &str = "$__toml_private_datetime";

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a metadata value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v).map(Value::Int).unwrap_or(Value::Float(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }

        Ok(Value::Array(Arc::new(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut dict = Dict::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<Value>()?;
            if key == TOML_DATETIME {
                return Ok(value);
            }

            dict.insert(key.into(), value);
        }

        Ok(Value::Dict(Arc::new(dict)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn parse_coerces_in_order() {
        assert_eq!(Value::parse("42"), Value::Int(42));
        assert_eq!(Value::parse(" -7 "), Value::Int(-7));
        assert_eq!(Value::parse("true"), Value::Bool(true));
        assert_eq!(Value::parse("F"), Value::Bool(false));
        assert_eq!(Value::parse("hello world"), Value::from("hello world"));
        assert_eq!(Value::parse("[a, b ,c]"), Value::from(vec!["a", "b", "c"]));
        assert_eq!(Value::parse("[]"), Value::from(Vec::<Value>::new()));
    }

    #[test]
    fn casts_never_fail() {
        assert_eq!(Value::from("12").cast_int(), 12);
        assert_eq!(Value::from("nope").cast_int(), 0);
        assert_eq!(Value::Null.cast_string(), "");
        assert_eq!(Value::Int(3).cast_string(), "3");
        assert!(Value::from("true").cast_bool());
        assert!(!Value::from(vec![1, 2]).cast_bool());
        assert_eq!(Value::from("a b  c").cast_string_slice(), vec!["a", "b", "c"]);
        assert_eq!(Value::from(vec![1, 2]).cast_string_slice(), vec!["1", "2"]);
    }

    #[test]
    fn merge_recurses_into_dicts() {
        let old = Value::from(dict! {
            "a" => 1,
            "nested" => dict! { "x" => "old", "y" => "kept" },
            "list" => vec!["one"],
        });

        let new = Value::from(dict! {
            "b" => 2,
            "nested" => dict! { "x" => "new" },
            "list" => vec!["two"],
        });

        let merged = old.merge(new);
        let merged = merged.as_dict().unwrap();
        assert_eq!(merged["a"], Value::Int(1));
        assert_eq!(merged["b"], Value::Int(2));

        let nested = merged["nested"].as_dict().unwrap();
        assert_eq!(nested["x"], Value::from("new"));
        assert_eq!(nested["y"], Value::from("kept"));
        assert_eq!(merged["list"], Value::from(vec!["one", "two"]));
    }

    #[test]
    fn scalars_replace_on_merge() {
        let merged = Value::from(dict! { "a" => 1 }).merge(Value::from("x"));
        assert_eq!(merged, Value::from("x"));
    }

    #[test]
    fn compare_is_numeric_then_lexicographic() {
        assert_eq!(Value::Int(2).compare(&Value::Int(10)), Ordering::Less);
        assert_eq!(Value::Float(2.5).compare(&Value::Int(2)), Ordering::Greater);
        assert_eq!(Value::from("b").compare(&Value::from("a")), Ordering::Greater);
        assert_eq!(Value::Null.compare(&Value::Int(1)), Ordering::Equal);
    }

    #[test]
    fn toml_datetimes_become_strings() {
        let value: Value = toml::from_str("date = 2023-01-02T03:04:05").unwrap();
        let date = &value.as_dict().unwrap()["date"];
        assert_eq!(date.as_str(), Some("2023-01-02T03:04:05"));
    }
}
