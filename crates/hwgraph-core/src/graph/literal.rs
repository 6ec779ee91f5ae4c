//! Property-map literals for SurrealQL statements.
//!
//! Vertex properties are written as one inline object literal per statement
//! (`UPSERT ... SET properties = { ... }`). The output is JSON-compatible, which
//! SurrealQL accepts verbatim.

use std::fmt::Write;
use thiserror::Error;

use super::value::{PropertyMap, PropertyValue};

/// Errors raised while rendering a literal.
#[derive(Debug, Error, PartialEq)]
pub enum LiteralError {
    /// NaN and infinities have no literal form.
    #[error("Non-finite number at '{path}': {value}")]
    NonFinite { path: String, value: f64 },
}

/// Renders a property map as an object literal.
pub fn to_literal(map: &PropertyMap) -> Result<String, LiteralError> {
    let mut out = String::new();
    write_map(&mut out, map, "")?;
    Ok(out)
}

/// Quotes a string, escaping characters that would end or corrupt it.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn write_map(out: &mut String, map: &PropertyMap, path: &str) -> Result<(), LiteralError> {
    if map.is_empty() {
        out.push_str("{}");
        return Ok(());
    }

    out.push_str("{ ");
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&quote(key));
        out.push_str(": ");
        write_value(out, value, &child_path(path, key))?;
    }
    out.push_str(" }");
    Ok(())
}

fn write_value(out: &mut String, value: &PropertyValue, path: &str) -> Result<(), LiteralError> {
    match value {
        PropertyValue::Null => out.push_str("NULL"),
        PropertyValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        PropertyValue::Integer(n) => {
            let _ = write!(out, "{}", n);
        }
        PropertyValue::Float(f) => {
            if !f.is_finite() {
                return Err(LiteralError::NonFinite {
                    path: path.to_string(),
                    value: *f,
                });
            }
            // Debug keeps the fractional part ("2.0"), so the store reads a float
            let _ = write!(out, "{:?}", f);
        }
        PropertyValue::String(s) => out.push_str(&quote(s)),
        PropertyValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, &format!("{}[{}]", path, i))?;
            }
            out.push(']');
        }
        PropertyValue::Map(map) => write_map(out, map, path)?,
    }
    Ok(())
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: serde_json::Value) -> PropertyMap {
        match PropertyValue::from(value) {
            PropertyValue::Map(map) => map,
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_flat_map() {
        let map = props(json!({ "deviceID": "cpu0", "type": "CPU", "cores": 8 }));
        assert_eq!(
            to_literal(&map).unwrap(),
            r#"{ "cores": 8, "deviceID": "cpu0", "type": "CPU" }"#
        );
    }

    #[test]
    fn test_nested_values() {
        let map = props(json!({
            "links": [{ "deviceID": "cpu0" }],
            "status": { "health": "OK", "state": "Enabled" },
            "ratio": 2.0,
            "spare": null,
            "hotplug": true
        }));
        assert_eq!(
            to_literal(&map).unwrap(),
            r#"{ "hotplug": true, "links": [{ "deviceID": "cpu0" }], "ratio": 2.0, "spare": NULL, "status": { "health": "OK", "state": "Enabled" } }"#
        );
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(to_literal(&PropertyMap::new()).unwrap(), "{}");
        let map = props(json!({ "links": [], "status": {} }));
        assert_eq!(to_literal(&map).unwrap(), r#"{ "links": [], "status": {} }"#);
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(quote("line\nnext\ttab"), r#""line\nnext\ttab""#);
        assert_eq!(quote("\u{1}"), r#""\u0001""#);
        assert_eq!(quote("café"), "\"café\"");
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut inner = PropertyMap::new();
        inner.insert("watts".into(), PropertyValue::Float(f64::INFINITY));
        let mut map = PropertyMap::new();
        map.insert("power".into(), PropertyValue::List(vec![PropertyValue::Map(inner)]));

        let err = to_literal(&map).unwrap_err();
        assert_eq!(
            err,
            LiteralError::NonFinite {
                path: "power[0].watts".into(),
                value: f64::INFINITY,
            }
        );
    }
}
