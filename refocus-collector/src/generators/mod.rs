//! Generators: named units of monitoring work assigned to this collector
//!
//! A generator is a JSON object with a non-empty `name` and any other fields,
//! which the collector forwards without interpreting. Generator files live in
//! a directory scanned on every heartbeat (see [`scanner`]); the set the
//! controller last confirmed is kept in a [`GeneratorStore`].

pub mod scanner;

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use scanner::{scan_dir, ScanResult, ScannedGenerator};

/// A generator definition keyed by `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Generator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Map::new(),
        }
    }

    /// Builder-style helper to attach a payload field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Decode a parsed JSON document into a generator.
    ///
    /// The document must be an object (not an array, not a scalar, not null)
    /// whose `name` is a non-empty string. Every other field becomes payload.
    pub fn decode(value: Value) -> Result<Self, DecodeError> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            Value::Array(_) => return Err(DecodeError::Array),
            other => return Err(DecodeError::NotAnObject(json_kind(&other))),
        };

        let name = match fields.remove("name") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(DecodeError::NameNotString),
            None => return Err(DecodeError::MissingName),
        };

        if name.is_empty() {
            return Err(DecodeError::EmptyName);
        }

        Ok(Self {
            name,
            payload: fields,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Generators last accepted by the controller, keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorStore {
    generators: BTreeMap<String, Generator>,
}

impl GeneratorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Generator> {
        self.generators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Insert or replace the generator stored under its name
    pub fn insert(&mut self, generator: Generator) -> Option<Generator> {
        self.generators.insert(generator.name.clone(), generator)
    }

    pub fn remove(&mut self, name: &str) -> Option<Generator> {
        self.generators.remove(name)
    }

    /// Generators in name order
    pub fn iter(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl FromIterator<Generator> for GeneratorStore {
    fn from_iter<I: IntoIterator<Item = Generator>>(iter: I) -> Self {
        let mut store = Self::new();
        for generator in iter {
            store.insert(generator);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_keeps_payload() {
        let generator = Generator::decode(json!({
            "name": "cpu-sampler",
            "interval": 60,
            "subjects": ["host-a"],
        }))
        .unwrap();

        assert_eq!(generator.name, "cpu-sampler");
        assert_eq!(generator.payload.len(), 2);
        assert_eq!(generator.payload["interval"], json!(60));
        assert!(!generator.payload.contains_key("name"));
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        assert_eq!(
            Generator::decode(json!([{"name": "a"}])),
            Err(DecodeError::Array)
        );
        assert_eq!(
            Generator::decode(json!("cpu")),
            Err(DecodeError::NotAnObject("string"))
        );
        assert_eq!(
            Generator::decode(Value::Null),
            Err(DecodeError::NotAnObject("null"))
        );
        assert_eq!(
            Generator::decode(json!({"interval": 5})),
            Err(DecodeError::MissingName)
        );
        assert_eq!(
            Generator::decode(json!({"name": 42})),
            Err(DecodeError::NameNotString)
        );
        assert_eq!(
            Generator::decode(json!({"name": ""})),
            Err(DecodeError::EmptyName)
        );
    }

    #[test]
    fn test_serialize_flattens_payload() {
        let generator = Generator::new("disk").with_field("path", json!("/"));
        let value = serde_json::to_value(&generator).unwrap();
        assert_eq!(value, json!({"name": "disk", "path": "/"}));

        let back: Generator = serde_json::from_value(value).unwrap();
        assert_eq!(back, generator);
    }

    #[test]
    fn test_store_is_keyed_by_name() {
        let mut store = GeneratorStore::new();
        assert!(store.insert(Generator::new("b")).is_none());
        store.insert(Generator::new("a"));
        let previous = store.insert(Generator::new("b").with_field("v", json!(2)));

        assert_eq!(previous, Some(Generator::new("b")));
        assert_eq!(store.len(), 2);
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(store.get("b").unwrap().payload["v"], json!(2));

        store.remove("a");
        assert!(!store.contains("a"));
    }
}
