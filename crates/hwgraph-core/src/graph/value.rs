//! Property values carried by graph vertices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A property map, ordered by key so that serialized output is stable.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single property value.
///
/// Incoming JSON is converted into this closed set once, at the ingestion
/// boundary. Everything downstream (the literal serializer, filters, the
/// composer) matches on these variants instead of inspecting raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(PropertyMap),
}

impl PropertyValue {
    /// Returns the string if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the string if this is a non-empty string value.
    pub fn as_non_empty_str(&self) -> Option<&str> {
        self.as_str().filter(|s| !s.is_empty())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns an integer view of numeric values. Floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Human-readable kind name, used in log messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                // u64 values above i64::MAX and all fractional numbers
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(map_from_json(map)),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

/// Converts a JSON object into a property map.
pub fn map_from_json(map: serde_json::Map<String, serde_json::Value>) -> PropertyMap {
    map.into_iter()
        .map(|(k, v)| (k, PropertyValue::from(v)))
        .collect()
}

/// Looks up a nested value by following map keys.
///
/// `lookup(&props, &["status", "health"])` reads `props.status.health`.
pub fn lookup<'a>(map: &'a PropertyMap, path: &[&str]) -> Option<&'a PropertyValue> {
    let (first, rest) = path.split_first()?;
    let mut current = map.get(*first)?;
    for key in rest {
        current = current.as_map()?.get(*key)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(PropertyValue::from(json!(7)), PropertyValue::Integer(7));
        assert_eq!(PropertyValue::from(json!(1.5)), PropertyValue::Float(1.5));
        assert_eq!(
            PropertyValue::from(json!(u64::MAX)),
            PropertyValue::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn test_from_json_nested() {
        let value = PropertyValue::from(json!({
            "status": { "state": "Enabled" },
            "links": [{ "deviceID": "cpu0" }],
            "note": null
        }));
        let map = value.as_map().unwrap();
        assert_eq!(
            lookup(map, &["status", "state"]).and_then(PropertyValue::as_str),
            Some("Enabled")
        );
        assert_eq!(map["links"].as_list().map(|l| l.len()), Some(1));
        assert!(map["note"].is_null());
    }

    #[test]
    fn test_lookup_missing_path() {
        let map = PropertyValue::from(json!({ "status": "broken" }));
        let map = map.as_map().unwrap();
        assert!(lookup(map, &["status", "health"]).is_none());
        assert!(lookup(map, &["absent"]).is_none());
        assert!(lookup(map, &[]).is_none());
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let mut map = PropertyMap::new();
        map.insert("deviceID".into(), "mem0".into());
        map.insert("size".into(), PropertyValue::Integer(64));
        map.insert("tags".into(), PropertyValue::List(vec![PropertyValue::Null]));

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, json!({ "deviceID": "mem0", "size": 64, "tags": [null] }));

        let back: PropertyMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_as_i64_truncates_floats() {
        assert_eq!(PropertyValue::Float(3.9).as_i64(), Some(3));
        assert_eq!(PropertyValue::Float(f64::NAN).as_i64(), None);
        assert_eq!(PropertyValue::String("3".into()).as_i64(), None);
    }
}
