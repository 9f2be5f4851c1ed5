use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collaborators::BackendCredentials;
use crate::error::{FlowError, FlowResult};
use crate::value::NumberLocale;

/// Configuration for the flow engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Contexts allocated when the engine starts
    #[serde(default = "default_pool_prewarm")]
    pub pool_prewarm: usize,
    /// Released contexts kept for reuse; extras are dropped
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle: usize,
    /// Default budget of `act_run_code` nodes
    #[serde(default = "default_script_timeout_ms")]
    pub script_timeout_ms: u64,
    /// Slack the script watchdog adds on top of the budget
    #[serde(default = "default_watchdog_buffer_ms")]
    pub watchdog_buffer_ms: u64,
    /// Decimal separator of the device locale
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
    /// Deepest allowed chain of `act_call_custom_flow` calls
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: u32,
    #[serde(default)]
    pub backend: BackendCredentials,
}

fn default_pool_prewarm() -> usize {
    4
}

fn default_pool_max_idle() -> usize {
    64
}

fn default_script_timeout_ms() -> u64 {
    1000
}

fn default_watchdog_buffer_ms() -> u64 {
    250
}

fn default_decimal_separator() -> char {
    '.'
}

fn default_max_call_depth() -> u32 {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pool_prewarm: default_pool_prewarm(),
            pool_max_idle: default_pool_max_idle(),
            script_timeout_ms: default_script_timeout_ms(),
            watchdog_buffer_ms: default_watchdog_buffer_ms(),
            decimal_separator: default_decimal_separator(),
            max_call_depth: default_max_call_depth(),
            backend: BackendCredentials::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> FlowResult<Self> {
        toml::from_str(content).map_err(|e| FlowError::ConfigError(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> FlowResult<Self> {
        serde_json::from_str(content).map_err(|e| FlowError::ConfigError(e.to_string()))
    }

    pub fn locale(&self) -> NumberLocale {
        NumberLocale::new(self.decimal_separator)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn watchdog_buffer(&self) -> Duration {
        Duration::from_millis(self.watchdog_buffer_ms)
    }
}
