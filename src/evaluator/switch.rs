use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::to_display_string;

/// Field type whose value is the player's segment list.
pub const SEGMENT_ID_FIELD: &str = "segmentID";

/// One case of an `i_switch` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    #[serde(default, alias = "type")]
    pub value: Value,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

/// Index of the first matching non-default case, else the default case,
/// else `-1`.
pub fn select_case(field_value: &Value, field_type: Option<&str>, cases: &[SwitchCase]) -> i64 {
    let field_str = to_display_string(field_value);
    for (index, case) in cases.iter().enumerate() {
        if case.is_default {
            continue;
        }
        let literal = to_display_string(&case.value);
        let matched = if field_type == Some(SEGMENT_ID_FIELD) {
            match field_value {
                Value::Array(items) => items.iter().any(|v| to_display_string(v) == literal),
                _ => field_str == literal,
            }
        } else {
            field_str == literal
        };
        if matched {
            return index as i64;
        }
    }

    cases
        .iter()
        .position(|c| c.is_default)
        .map(|i| i as i64)
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cases(v: Value) -> Vec<SwitchCase> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let cs = cases(json!([{"type": "A"}, {"type": "B"}, {"type": "A"}]));
        assert_eq!(select_case(&json!("A"), None, &cs), 0);
        assert_eq!(select_case(&json!("B"), None, &cs), 1);
    }

    #[test]
    fn test_falls_back_to_default() {
        let cs = cases(json!([{"type": "A"}, {"type": "B", "isDefault": true}]));
        assert_eq!(select_case(&json!("C"), None, &cs), 1);
    }

    #[test]
    fn test_default_case_not_matched_by_value() {
        let cs = cases(json!([{"type": "B", "isDefault": true}, {"type": "B"}]));
        assert_eq!(select_case(&json!("B"), None, &cs), 1);
    }

    #[test]
    fn test_no_match_no_default() {
        let cs = cases(json!([{"type": "A"}]));
        assert_eq!(select_case(&json!("Z"), None, &cs), -1);
        assert_eq!(select_case(&json!("Z"), None, &[]), -1);
    }

    #[test]
    fn test_number_field_matches_string_literal() {
        let cs = cases(json!([{"value": "3"}, {"value": 4}]));
        assert_eq!(select_case(&json!(4), None, &cs), 1);
        assert_eq!(select_case(&json!(3.0), None, &cs), 0);
    }

    #[test]
    fn test_segment_field_contains() {
        let cs = cases(json!([{"value": "whale"}, {"value": "vip"}, {"value": "x", "isDefault": true}]));
        let segments = json!(["new_player", "vip"]);
        assert_eq!(select_case(&segments, Some(SEGMENT_ID_FIELD), &cs), 1);
        assert_eq!(select_case(&json!([]), Some(SEGMENT_ID_FIELD), &cs), 2);
    }
}
