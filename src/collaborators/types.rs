use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value type of a player stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    #[default]
    Number,
    String,
    Boolean,
}

impl StatType {
    /// Coercion target name for values of this stat.
    pub fn target(&self) -> &'static str {
        match self {
            StatType::Number => "number",
            StatType::String => "string",
            StatType::Boolean => "boolean",
        }
    }
}

/// Player stat template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatTemplate {
    pub id: String,
    pub internal_id: String,
    #[serde(rename = "type", default)]
    pub value_type: StatType,
    #[serde(default)]
    pub range_min: Option<f64>,
    #[serde(default)]
    pub range_max: Option<f64>,
    #[serde(default)]
    pub default_value: Value,
}

impl StatTemplate {
    pub fn number(internal_id: impl Into<String>) -> Self {
        let internal_id = internal_id.into();
        Self {
            id: internal_id.clone(),
            internal_id,
            value_type: StatType::Number,
            range_min: None,
            range_max: None,
            default_value: Value::from(0),
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range_min = Some(min);
        self.range_max = Some(max);
        self
    }

    pub fn with_type(mut self, value_type: StatType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Clamp to the template range (open ends are unbounded).
    pub fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(min) = self.range_min {
            if v < min {
                v = min;
            }
        }
        if let Some(max) = self.range_max {
            if v > max {
                v = max;
            }
        }
        v
    }
}

/// Offer carried through an `t_offer_shown` run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSnapshot {
    pub internal_id: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub price: Value,
    /// Entity ids granted by the offer
    #[serde(default)]
    pub content: Vec<String>,
}

impl OfferSnapshot {
    pub fn new(internal_id: impl Into<String>) -> Self {
        Self {
            internal_id: internal_id.into(),
            ..Default::default()
        }
    }
}

/// Entity config carried through a `t_config_param_retrieved` run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    pub id: String,
    #[serde(default)]
    pub values: Vec<ConfigValue>,
}

impl EntityConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: ConfigValue) -> Self {
        self.values.push(value);
        self
    }

    /// Find a leaf by slot id, looking one level into `map` values.
    pub fn find_slot_mut(&mut self, slot_id: &str) -> Option<&mut ConfigValue> {
        for entry in self.values.iter_mut() {
            if entry.slot_id == slot_id {
                return Some(entry);
            }
            if entry.is_map() {
                if let Some(inner) = entry.values.iter_mut().find(|v| v.slot_id == slot_id) {
                    return Some(inner);
                }
            }
        }
        None
    }

    pub fn find_slot(&self, slot_id: &str) -> Option<&ConfigValue> {
        self.values.iter().find_map(|entry| {
            if entry.slot_id == slot_id {
                Some(entry)
            } else if entry.is_map() {
                entry.values.iter().find(|v| v.slot_id == slot_id)
            } else {
                None
            }
        })
    }
}

/// One value in an entity config tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValue {
    pub slot_id: String,
    #[serde(rename = "type", default)]
    pub value_type: String,
    #[serde(default)]
    pub value: Value,
    /// Nested entries of a `map` value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ConfigValue>,
}

impl ConfigValue {
    pub fn leaf(slot_id: impl Into<String>, value_type: impl Into<String>, value: Value) -> Self {
        Self {
            slot_id: slot_id.into(),
            value_type: value_type.into(),
            value,
            values: Vec::new(),
        }
    }

    pub fn map(slot_id: impl Into<String>, values: Vec<ConfigValue>) -> Self {
        Self {
            slot_id: slot_id.into(),
            value_type: "map".to_string(),
            value: Value::Null,
            values,
        }
    }

    pub fn is_map(&self) -> bool {
        self.value_type == "map"
    }
}

/// Credentials attached to every backend action
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendCredentials {
    pub device_id: String,
    pub secret: String,
    pub env: String,
    pub build: String,
}

/// Best-effort call to the live-ops backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendAction {
    pub device_id: String,
    pub secret: String,
    pub env: String,
    pub build: String,
    pub action: String,
    pub payload: Value,
}

impl BackendAction {
    pub fn new(credentials: &BackendCredentials, action: impl Into<String>, payload: Value) -> Self {
        Self {
            device_id: credentials.device_id.clone(),
            secret: credentials.secret.clone(),
            env: credentials.env.clone(),
            build: credentials.build.clone(),
            action: action.into(),
            payload,
        }
    }
}

/// Event custom data, as carried between flows.
pub type CustomData = Map<String, Value>;
