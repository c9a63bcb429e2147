//! Tagged metadata values as decoded from the tool's structured JSON output.
//!
//! `Map` keeps insertion order so that structured composites (`-struct`)
//! render in the same field order the tool emitted them.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata for one file: `Group:Tag` -> value.
pub type RawMetadata = BTreeMap<String, MetaValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<MetaValue>),
    Map(Vec<(String, MetaValue)>),
}

impl MetaValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Scalars render as their plain text; lists and maps as pretty JSON.
    /// Null renders as an empty string (callers that must hide nulls check
    /// [`MetaValue::is_null`] first).
    pub fn to_text(&self) -> String {
        match self {
            MetaValue::Null => String::new(),
            MetaValue::Bool(b) => b.to_string(),
            MetaValue::Number(n) => n.to_string(),
            MetaValue::String(s) => s.clone(),
            MetaValue::List(_) | MetaValue::Map(_) => {
                serde_json::to_string_pretty(self).unwrap_or_default()
            }
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::String(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::String(s)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v)
            .map(MetaValue::Number)
            .unwrap_or(MetaValue::Null)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Number(v.into())
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetaValue::Null => serializer.serialize_unit(),
            MetaValue::Bool(b) => serializer.serialize_bool(*b),
            MetaValue::Number(n) => n.serialize(serializer),
            MetaValue::String(s) => serializer.serialize_str(s),
            MetaValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            MetaValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct MetaValueVisitor;

impl<'de> Visitor<'de> for MetaValueVisitor {
    type Value = MetaValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<MetaValue, E> {
        Ok(MetaValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<MetaValue, E> {
        Ok(MetaValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<MetaValue, D::Error> {
        Deserialize::deserialize(d)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<MetaValue, E> {
        Ok(MetaValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MetaValue, E> {
        Ok(MetaValue::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MetaValue, E> {
        Ok(MetaValue::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MetaValue, E> {
        Ok(MetaValue::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MetaValue, E> {
        Ok(MetaValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<MetaValue, E> {
        Ok(MetaValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MetaValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(MetaValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<MetaValue, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<String, MetaValue>()? {
            entries.push((k, v));
        }
        Ok(MetaValue::Map(entries))
    }
}

impl<'de> Deserialize<'de> for MetaValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MetaValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_map_order() {
        let v: MetaValue = serde_json::from_str(r#"{"z": 1, "a": 2}"#).unwrap();
        match v {
            MetaValue::Map(entries) => {
                assert_eq!(entries[0].0, "z");
                assert_eq!(entries[1].0, "a");
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(MetaValue::from("Nikon").to_text(), "Nikon");
        assert_eq!(MetaValue::from(41.0).to_text(), "41.0");
        assert_eq!(MetaValue::from(7i64).to_text(), "7");
        assert_eq!(MetaValue::Bool(true).to_text(), "true");
        assert_eq!(MetaValue::Null.to_text(), "");
    }

    #[test]
    fn test_list_renders_as_pretty_json() {
        let v: MetaValue = serde_json::from_str(r#"["a", "ü"]"#).unwrap();
        assert_eq!(v.to_text(), "[\n  \"a\",\n  \"ü\"\n]");
    }

    #[test]
    fn test_null_decodes() {
        let v: MetaValue = serde_json::from_str("null").unwrap();
        assert!(v.is_null());
    }
}
