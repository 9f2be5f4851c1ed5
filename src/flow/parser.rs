//! Flow loader: converts JSON/TOML text into [`FlowDefinition`]s.

use super::model::FlowDefinition;
use crate::error::{FlowError, FlowResult};

/// Supported flow input formats.
#[derive(Debug, Clone, Copy)]
pub enum FlowFormat {
    /// JSON format (`.json`).
    Json,
    /// TOML format (`.toml`).
    Toml,
}

/// Parse a single flow.
pub fn parse_flow(content: &str, format: FlowFormat) -> FlowResult<FlowDefinition> {
    let value = parse_value(content, format)?;
    serde_json::from_value(value).map_err(|e| FlowError::ParseError(e.to_string()))
}

/// Parse a list of flows: a JSON array, or a TOML document with `[[flows]]`.
pub fn parse_flows(content: &str, format: FlowFormat) -> FlowResult<Vec<FlowDefinition>> {
    let value = parse_value(content, format)?;
    let list = match value {
        serde_json::Value::Object(mut obj) if obj.contains_key("flows") => {
            obj.remove("flows").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(list).map_err(|e| FlowError::ParseError(e.to_string()))
}

fn parse_value(content: &str, format: FlowFormat) -> FlowResult<serde_json::Value> {
    match format {
        FlowFormat::Json => {
            serde_json::from_str(content).map_err(|e| FlowError::ParseError(e.to_string()))
        }
        FlowFormat::Toml => {
            // Go through toml::Value so free-form params keep their JSON shape.
            let toml_val: toml::Value =
                toml::from_str(content).map_err(|e| FlowError::ParseError(e.to_string()))?;
            Ok(toml_value_to_json(toml_val))
        }
    }
}

/// Convert a [`toml::Value`] into a [`serde_json::Value`].
///
/// TOML has no datetime equivalent in JSON, so datetimes are stringified.
pub(crate) fn toml_value_to_json(val: toml::Value) -> serde_json::Value {
    match val {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_value_to_json).collect())
        }
        toml::Value::Table(tbl) => {
            let map: serde_json::Map<String, serde_json::Value> = tbl
                .into_iter()
                .map(|(k, v)| (k, toml_value_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::OpTag;

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "id": "welcome",
            "root": {
                "op": "t_session_start",
                "slotId": "root",
                "children": [
                    {
                        "op": "ops_add",
                        "slotId": "add",
                        "params": {
                            "value1": {"value": 2, "type": "number", "isLiteral": true},
                            "value2": {"value": 3, "type": "number", "isLiteral": true},
                            "savedVariable": "sum"
                        }
                    }
                ]
            }
        }"#;
        let flow = parse_flow(json, FlowFormat::Json).unwrap();
        assert_eq!(flow.id, "welcome");
        assert_eq!(flow.root.op, OpTag::SessionStart);
        assert_eq!(flow.root.children[0].saved_variable(), Some("sum"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
id = "bonus"

[root]
op = "t_custom"
slotId = "root"
params = { triggerId = "bonus_time" }

[[root.children]]
op = "act_segment_add"
slotId = "seg"
params = { segmentId = "bonus_seen" }
"#;
        let flow = parse_flow(toml, FlowFormat::Toml).unwrap();
        assert_eq!(flow.root.op, OpTag::CustomTrigger);
        assert_eq!(flow.root.str_param("triggerId"), Some("bonus_time"));
        assert_eq!(flow.root.children[0].op, OpTag::SegmentAdd);
    }

    #[test]
    fn test_parse_flows_list() {
        let json = r#"[
            {"id": "a", "root": {"op": "t_session_start"}},
            {"id": "b", "root": {"op": "t_custom"}}
        ]"#;
        let flows = parse_flows(json, FlowFormat::Json).unwrap();
        assert_eq!(flows.len(), 2);

        let toml = r#"
[[flows]]
id = "a"
root = { op = "t_item_added" }
"#;
        let flows = parse_flows(toml, FlowFormat::Toml).unwrap();
        assert_eq!(flows[0].root.op, OpTag::ItemAdded);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_flow("{ not json", FlowFormat::Json).unwrap_err();
        assert!(matches!(err, FlowError::ParseError(_)));
        let err = parse_flow(r#"{"root": {"op": "i_return"}}"#, FlowFormat::Json).unwrap_err();
        assert!(err.to_string().contains("id"));
    }
}
