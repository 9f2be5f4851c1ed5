use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::coercion::to_display_string;
use crate::core::VariableStore;
use crate::error::{NodeError, NodeResult};

/// Lookup key that refers to the previous node's result.
pub const PREVIOUS_RESULT: &str = "$previous";

/// Declared type of a [`ValueRef`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Boolean,
    /// Look up in local (saved) variables
    Variable,
    /// Any other declared type reads contextual variables
    #[serde(other)]
    Other,
}

/// Tagged reference to a node input.
///
/// Literal refs carry their value; otherwise `value` is the lookup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRef {
    #[serde(default, alias = "raw")]
    pub value: Value,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(rename = "isLiteral", default)]
    pub is_literal: bool,
}

impl ValueRef {
    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        let value_type = match &value {
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            _ => ValueType::String,
        };
        Self {
            value,
            value_type,
            is_literal: true,
        }
    }

    /// Reference to a local (saved) variable.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            value: Value::String(name.into()),
            value_type: ValueType::Variable,
            is_literal: false,
        }
    }

    /// Reference to a contextual variable.
    pub fn contextual(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            value: Value::String(name.into()),
            value_type,
            is_literal: false,
        }
    }

    pub fn previous() -> Self {
        Self::contextual(PREVIOUS_RESULT, ValueType::Other)
    }

    /// Resolve against the previous result and the variable store.
    pub fn resolve(&self, prev: &Value, store: &VariableStore) -> NodeResult<Value> {
        if self.is_literal {
            return Ok(self.value.clone());
        }

        let key = to_display_string(&self.value);
        if key == PREVIOUS_RESULT {
            return Ok(prev.clone());
        }

        let found = match self.value_type {
            ValueType::Variable => store.local(&key),
            _ => store.contextual(&key),
        };
        found.cloned().ok_or_else(|| {
            let scope = match self.value_type {
                ValueType::Variable => "local",
                _ => "contextual",
            };
            NodeError::LookupError(format!("{} variable '{}'", scope, key))
        })
    }

    /// Like [`resolve`](Self::resolve), with missing variables read as null.
    pub fn resolve_or_null(&self, prev: &Value, store: &VariableStore) -> Value {
        self.resolve(prev, store).unwrap_or(Value::Null)
    }
}
