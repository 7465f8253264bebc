//! Configuration layers

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One named, ordered JSON fragment contributing to a composed document.
///
/// Precedence is unique within one composition call; layers fold in
/// ascending precedence order, so later layers win where a strategy says
/// "last writer".
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Where this fragment came from, for error reporting
    pub source_id: String,
    /// Lower is applied first
    pub precedence: u32,
    fragment: Map<String, Value>,
}

impl Layer {
    /// Wrap an already-parsed fragment. Fails unless it is a JSON object.
    pub fn new(source_id: impl Into<String>, precedence: u32, fragment: Value) -> Result<Self> {
        let source_id = source_id.into();
        match fragment {
            Value::Object(map) => Ok(Self {
                source_id,
                precedence,
                fragment: map,
            }),
            other => Err(Error::InvalidFragment {
                source_id,
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Parse a fragment from JSON text.
    ///
    /// A fragment that fails to parse fails the whole composition; there is
    /// no partial application.
    pub fn parse(source_id: impl Into<String>, precedence: u32, text: &str) -> Result<Self> {
        let source_id = source_id.into();
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidFragment {
            source_id: source_id.clone(),
            message: e.to_string(),
        })?;
        Self::new(source_id, precedence, value)
    }

    /// The fragment's top-level keys and values.
    pub fn fragment(&self) -> &Map<String, Value> {
        &self.fragment
    }
}

/// JSON type name for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
