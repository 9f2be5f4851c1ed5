//! Node handlers.
//!
//! Each handler receives the node, the run's context, the previous result and
//! the collaborators, and returns the node result. Async handlers that need
//! the engine itself (custom flows) live in the engine module.

pub mod actions;
pub mod apply_change;
pub mod control_flow;
pub mod math;
pub mod player;
#[cfg(feature = "builtin-sandbox-js")]
pub mod script;
pub mod variables;

use std::sync::Arc;

use serde_json::Value;

use crate::collaborators::{
    BackendAction, BackendActionSender, BackendCredentials, EntityRegistry, PlayerStore,
    RandomSource, TemplateRegistry,
};
use crate::core::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::flow::Node;
use crate::value::{to_display_string, NumberLocale};

/// Collaborators and settings visible to node handlers.
pub struct NodeEnv<'a> {
    pub locale: NumberLocale,
    pub player: &'a dyn PlayerStore,
    pub templates: &'a dyn TemplateRegistry,
    pub entities: &'a dyn EntityRegistry,
    pub backend: &'a Arc<dyn BackendActionSender>,
    pub credentials: &'a BackendCredentials,
    pub random: &'a dyn RandomSource,
}

impl NodeEnv<'_> {
    /// Fire-and-forget backend call. Failures are logged and never reach the
    /// run.
    pub fn sync_backend(&self, flow_id: &str, action: &str, payload: Value) {
        let backend = Arc::clone(self.backend);
        let action = BackendAction::new(self.credentials, action, payload);
        let flow_id = flow_id.to_string();
        tokio::spawn(async move {
            let name = action.action.clone();
            if let Err(e) = backend.send_action(action).await {
                let e = match e {
                    NodeError::BackendSyncError(_) => e,
                    other => NodeError::BackendSyncError(other.to_string()),
                };
                tracing::warn!(
                    flow_id = %flow_id,
                    action = %name,
                    error_code = e.error_code(),
                    error = %e,
                    "backend sync failed"
                );
            }
        });
    }

    /// Push the player's current segment list into the `segment` variable.
    pub fn refresh_segments(&self, ctx: &mut ExecutionContext) {
        let segments = self.player.segments();
        ctx.variables
            .set_contextual(SEGMENT_VARIABLE, Value::from(segments));
    }
}

/// Contextual variable holding the player's segment list.
pub const SEGMENT_VARIABLE: &str = "segment";

/// Read an id parameter given either as a plain string or as a value ref.
pub(crate) fn id_param(
    node: &Node,
    key: &str,
    ctx: &ExecutionContext,
    prev: &Value,
) -> NodeResult<String> {
    if let Some(id) = node.str_param(key) {
        return Ok(id.to_string());
    }
    let id = match node.value_ref(key)? {
        Some(r) => to_display_string(&r.resolve(prev, &ctx.variables)?),
        None => String::new(),
    };
    if id.is_empty() {
        return Err(NodeError::ValidationError(format!(
            "{} requires parameter '{}'",
            node.op, key
        )));
    }
    Ok(id)
}

/// Resolve an optional value ref, defaulting to the previous result.
pub(crate) fn input_or_previous(
    node: &Node,
    key: &str,
    ctx: &ExecutionContext,
    prev: &Value,
) -> NodeResult<Value> {
    Ok(match node.value_ref(key)? {
        Some(r) => r.resolve_or_null(prev, &ctx.variables),
        None => prev.clone(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::NodeEnv;
    use crate::collaborators::in_memory::{
        InMemoryEntityRegistry, InMemoryPlayerStore, InMemoryTemplateRegistry, RecordingBackend,
        ScriptedRandom,
    };
    use crate::collaborators::{BackendActionSender, BackendCredentials, StatTemplate};
    use crate::value::NumberLocale;

    /// Owns the collaborators a [`NodeEnv`] borrows.
    pub struct Fixture {
        pub player: InMemoryPlayerStore,
        pub templates: InMemoryTemplateRegistry,
        pub entities: InMemoryEntityRegistry,
        pub backend: Arc<RecordingBackend>,
        pub backend_dyn: Arc<dyn BackendActionSender>,
        pub credentials: BackendCredentials,
        pub random: ScriptedRandom,
    }

    impl Fixture {
        pub fn new() -> Self {
            let backend = Arc::new(RecordingBackend::new());
            Self {
                player: InMemoryPlayerStore::new(),
                templates: InMemoryTemplateRegistry::new(Vec::new()),
                entities: InMemoryEntityRegistry::new(),
                backend_dyn: backend.clone(),
                backend,
                credentials: BackendCredentials::default(),
                random: ScriptedRandom::new([0.5]),
            }
        }

        pub fn with_templates(mut self, templates: Vec<StatTemplate>) -> Self {
            self.templates = InMemoryTemplateRegistry::new(templates);
            self
        }

        pub fn env(&self) -> NodeEnv<'_> {
            NodeEnv {
                locale: NumberLocale::default(),
                player: &self.player,
                templates: &self.templates,
                entities: &self.entities,
                backend: &self.backend_dyn,
                credentials: &self.credentials,
                random: &self.random,
            }
        }
    }
}
