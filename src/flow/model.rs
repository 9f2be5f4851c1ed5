use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NodeError, NodeResult};
use crate::value::ValueRef;

/// Immutable flow: an id and a tree of nodes rooted at a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub id: String,
    pub root: Node,
}

impl FlowDefinition {
    pub fn new(id: impl Into<String>, root: Node) -> Self {
        Self {
            id: id.into(),
            root,
        }
    }

    /// Segment the platform assigns to players who entered this flow.
    pub fn auto_segment(&self) -> String {
        format!("flow_{}", self.id)
    }
}

/// One operation in a flow.
///
/// Children are ordered: branch, switch and split-test pick a child by index,
/// every other node visits them in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(alias = "opTag")]
    pub op: OpTag,
    #[serde(rename = "slotId", default)]
    pub slot_id: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(op: OpTag, slot_id: impl Into<String>) -> Self {
        Self {
            op,
            slot_id: slot_id.into(),
            params: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    /// Non-empty string parameter, if present.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.param(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn require_str(&self, key: &str) -> NodeResult<&str> {
        self.str_param(key).ok_or_else(|| {
            NodeError::ValidationError(format!("{} requires parameter '{}'", self.op, key))
        })
    }

    pub fn bool_param(&self, key: &str) -> bool {
        self.param(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn value_ref(&self, key: &str) -> NodeResult<Option<ValueRef>> {
        match self.param(key) {
            None => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
                NodeError::ValidationError(format!(
                    "{} parameter '{}' is not a value reference: {}",
                    self.op, key, e
                ))
            }),
        }
    }

    pub fn require_value_ref(&self, key: &str) -> NodeResult<ValueRef> {
        self.value_ref(key)?.ok_or_else(|| {
            NodeError::ValidationError(format!("{} requires parameter '{}'", self.op, key))
        })
    }

    /// Deserialize a structured parameter.
    pub fn typed_param<T: serde::de::DeserializeOwned>(&self, key: &str) -> NodeResult<T> {
        let raw = self.param(key).cloned().ok_or_else(|| {
            NodeError::ValidationError(format!("{} requires parameter '{}'", self.op, key))
        })?;
        serde_json::from_value(raw).map_err(|e| {
            NodeError::ValidationError(format!("{} parameter '{}': {}", self.op, key, e))
        })
    }

    /// Local variable the node result is bound to.
    pub fn saved_variable(&self) -> Option<&str> {
        self.str_param("savedVariable")
    }
}

macro_rules! op_tags {
    ($($variant:ident => $tag:literal),* $(,)?) => {
        /// Closed set of node operations. Unrecognised tags load as
        /// [`OpTag::Unknown`] and are skipped at run time.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum OpTag {
            $(
                #[serde(rename = $tag)]
                $variant,
            )*
            #[serde(other)]
            Unknown,
        }

        impl OpTag {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(OpTag::$variant => $tag,)*
                    OpTag::Unknown => "unknown",
                }
            }
        }
    };
}

op_tags! {
    // arithmetic
    Add => "ops_add",
    Subtract => "ops_subtract",
    Multiply => "ops_multiply",
    Divide => "ops_divide",
    Power => "ops_power",
    Modulo => "ops_modulo",
    // numeric helpers
    Ceil => "ops_ceil",
    Floor => "ops_floor",
    Round => "ops_round",
    Clamp => "ops_clamp",
    Random => "ops_random",
    // variables
    SetVariable => "ops_set_variable",
    GetVariable => "ops_get_variable",
    // control flow
    Branch => "i_branch",
    Switch => "i_switch",
    SplitTest => "i_split_test",
    Sequence => "i_sequence",
    Return => "i_return",
    // segments and stats
    SegmentAdd => "act_segment_add",
    SegmentRemove => "act_segment_remove",
    StatAdd => "act_stat_add",
    StatSubtract => "act_stat_subtract",
    StatSet => "act_stat_set",
    // actions
    ApplyChange => "act_apply_change",
    CallCustomFlow => "act_call_custom_flow",
    ShowOffer => "act_show_offer",
    SendEvent => "act_send_event",
    RunCode => "act_run_code",
    // triggers
    SessionStart => "t_session_start",
    CustomTrigger => "t_custom",
    OfferShown => "t_offer_shown",
    ConfigParamRetrieved => "t_config_param_retrieved",
    ItemAdded => "t_item_added",
    ItemRemoved => "t_item_removed",
    StatChanged => "t_stat_changed",
    SegmentEnter => "t_segment_enter",
    SegmentExit => "t_segment_exit",
    AnalyticsEventSend => "t_analytics_event_send",
}

impl OpTag {
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            OpTag::SessionStart
                | OpTag::CustomTrigger
                | OpTag::OfferShown
                | OpTag::ConfigParamRetrieved
                | OpTag::ItemAdded
                | OpTag::ItemRemoved
                | OpTag::StatChanged
                | OpTag::SegmentEnter
                | OpTag::SegmentExit
                | OpTag::AnalyticsEventSend
        )
    }
}

impl std::fmt::Display for OpTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_deserialize() {
        let node: Node = serde_json::from_value(json!({
            "op": "i_branch",
            "slotId": "b1",
            "params": { "conditions": [] },
            "children": [
                { "op": "i_return", "slotId": "r1" },
                { "op": "ops_add", "slotId": "a1" }
            ]
        }))
        .unwrap();
        assert_eq!(node.op, OpTag::Branch);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].op, OpTag::Return);
        assert!(node.children[0].params.is_empty());
    }

    #[test]
    fn test_unknown_tag() {
        let node: Node =
            serde_json::from_value(json!({"opTag": "legacy_thing", "slotId": "x"})).unwrap();
        assert_eq!(node.op, OpTag::Unknown);
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(OpTag::SplitTest.as_str(), "i_split_test");
        assert_eq!(
            serde_json::to_value(OpTag::AnalyticsEventSend).unwrap(),
            json!("t_analytics_event_send")
        );
        assert!(OpTag::OfferShown.is_trigger());
        assert!(!OpTag::Return.is_trigger());
    }

    #[test]
    fn test_param_helpers() {
        let node = Node::new(OpTag::SetVariable, "s1")
            .with_param("name", "score")
            .with_param("empty", "")
            .with_param("value", json!({"value": 3, "type": "number", "isLiteral": true}));
        assert_eq!(node.str_param("name"), Some("score"));
        assert_eq!(node.str_param("empty"), None);
        assert!(node.require_str("missing").is_err());
        assert_eq!(
            node.require_value_ref("value").unwrap(),
            ValueRef::literal(3)
        );
        assert!(matches!(
            Node::new(OpTag::Add, "a").with_param("value1", 5).value_ref("value1"),
            Err(NodeError::ValidationError(_))
        ));
    }

    #[test]
    fn test_auto_segment() {
        let flow = FlowDefinition::new("welcome", Node::new(OpTag::SessionStart, "root"));
        assert_eq!(flow.auto_segment(), "flow_welcome");
    }
}
