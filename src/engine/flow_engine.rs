use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

#[cfg(feature = "builtin-sandbox-js")]
use liveflow_sandbox_js::{ScriptSandbox, ScriptSandboxConfig, ScriptStats};

use super::config::EngineConfig;
use crate::collaborators::in_memory::{
    InMemoryEntityRegistry, InMemoryFlowRegistry, InMemoryPlayerStore, InMemoryTemplateRegistry,
    RecordingBackend,
};
use crate::collaborators::{
    BackendActionSender, CustomFlowDispatcher, EntityConfig, EntityRegistry, FlowRegistry,
    OfferSnapshot, PlayerStore, RandomSource, TemplateRegistry, ThreadRandom,
};
use crate::core::{ContextPool, ExecutionContext, PoolStats};
use crate::error::{NodeError, NodeResult};
use crate::flow::{FlowDefinition, Node, OpTag};
use crate::nodes::{
    actions, apply_change, control_flow, id_param, math, player, variables, NodeEnv,
    SEGMENT_VARIABLE,
};
use crate::value::NumberLocale;

/// Inputs of a single flow run
#[derive(Debug, Clone, Default)]
pub struct FlowInvocation {
    /// Overlaid on the seeded contextual variables
    pub contextual_seed: Vec<(String, Value)>,
    /// Previous result of the root node
    pub trigger_seed: Value,
    pub entity_config: Option<EntityConfig>,
    pub offer: Option<OfferSnapshot>,
    pub event_custom_data: Option<Map<String, Value>>,
    /// Custom-flow nesting level
    pub depth: u32,
}

impl FlowInvocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contextual(mut self, id: impl Into<String>, value: Value) -> Self {
        self.contextual_seed.push((id.into(), value));
        self
    }

    pub fn with_contextual_seed(mut self, seed: Map<String, Value>) -> Self {
        self.contextual_seed.extend(seed);
        self
    }

    pub fn with_trigger_seed(mut self, seed: Value) -> Self {
        self.trigger_seed = seed;
        self
    }

    pub fn with_entity_config(mut self, config: EntityConfig) -> Self {
        self.entity_config = Some(config);
        self
    }

    pub fn with_offer(mut self, offer: OfferSnapshot) -> Self {
        self.offer = Some(offer);
        self
    }

    pub fn with_event_custom_data(mut self, data: Map<String, Value>) -> Self {
        self.event_custom_data = Some(data);
        self
    }

    pub fn at_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// What a run leaves behind: local variables and the carry objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowRunResult {
    pub flow_id: String,
    pub local_vars: HashMap<String, Value>,
    pub entity_config: Option<EntityConfig>,
    pub offer: Option<OfferSnapshot>,
    pub event_custom_data: Option<Map<String, Value>>,
    /// Whether an `i_return` ended the run
    pub stopped: bool,
}

/// Tree-walking interpreter for flows.
///
/// Runs share nothing but the collaborators; each one checks out its own
/// [`ExecutionContext`] from the pool.
pub struct FlowEngine {
    config: EngineConfig,
    locale: NumberLocale,
    pool: ContextPool,
    player: Arc<dyn PlayerStore>,
    templates: Arc<dyn TemplateRegistry>,
    entities: Arc<dyn EntityRegistry>,
    backend: Arc<dyn BackendActionSender>,
    pub(crate) flows: Arc<dyn FlowRegistry>,
    custom_flows: Option<Arc<dyn CustomFlowDispatcher>>,
    random: Arc<dyn RandomSource>,
    #[cfg(feature = "builtin-sandbox-js")]
    sandbox: Arc<ScriptSandbox>,
}

impl FlowEngine {
    pub fn builder() -> FlowEngineBuilder {
        FlowEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    #[cfg(feature = "builtin-sandbox-js")]
    pub async fn sandbox_stats(&self) -> ScriptStats {
        self.sandbox.get_stats().await
    }

    /// Run `flow` and return its local variables.
    pub async fn execute(
        &self,
        flow: &FlowDefinition,
        contextual_seed: Option<Map<String, Value>>,
        trigger_seed: Option<Value>,
    ) -> HashMap<String, Value> {
        let mut invocation =
            FlowInvocation::new().with_trigger_seed(trigger_seed.unwrap_or(Value::Null));
        if let Some(seed) = contextual_seed {
            invocation = invocation.with_contextual_seed(seed);
        }
        self.execute_with(flow, invocation).await.local_vars
    }

    /// Run `flow`, threading carry objects in and out.
    pub async fn execute_with(
        &self,
        flow: &FlowDefinition,
        invocation: FlowInvocation,
    ) -> FlowRunResult {
        let mut ctx = self.pool.checkout();
        ctx.flow_id = flow.id.clone();
        ctx.call_depth = invocation.depth;
        ctx.entity_config = invocation.entity_config;
        ctx.offer = invocation.offer;
        ctx.event_custom_data = invocation.event_custom_data;

        if self.player.has_segment(&flow.auto_segment()) {
            self.player.on_flow_entered(&flow.id);
        }

        for template in self.templates.templates() {
            let value = self
                .player
                .stat_value(&template.internal_id)
                .unwrap_or_else(|| template.default_value.clone());
            ctx.variables.set_contextual(template.internal_id, value);
        }
        ctx.variables
            .set_contextual(SEGMENT_VARIABLE, Value::from(self.player.segments()));
        for (id, value) in invocation.contextual_seed {
            ctx.variables.set_contextual(id, value);
        }

        tracing::info!(flow_id = %flow.id, depth = invocation.depth, "flow run started");
        self.visit(&flow.root, &mut ctx, invocation.trigger_seed)
            .await;

        let result = FlowRunResult {
            flow_id: flow.id.clone(),
            local_vars: ctx.variables.take_locals(),
            entity_config: ctx.entity_config.take(),
            offer: ctx.offer.take(),
            event_custom_data: ctx.event_custom_data.take(),
            stopped: ctx.stopped,
        };
        tracing::info!(
            flow_id = %flow.id,
            locals = result.local_vars.len(),
            stopped = result.stopped,
            "flow run finished"
        );
        self.pool.release(ctx);
        result
    }

    /// Visit `node` and whichever children its result selects. A failing node
    /// is logged and its subtree skipped; the rest of the run continues.
    fn visit<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        prev: Value,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if ctx.stopped {
                return;
            }
            if node.op == OpTag::Unknown {
                tracing::debug!(
                    flow_id = %ctx.flow_id,
                    slot_id = %node.slot_id,
                    "no handler for node; skipped"
                );
                return;
            }

            let result = match self.dispatch(node, ctx, &prev).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(
                        flow_id = %ctx.flow_id,
                        slot_id = %node.slot_id,
                        op = node.op.as_str(),
                        error_code = e.error_code(),
                        error = %e,
                        "node failed; skipping its subtree"
                    );
                    return;
                }
            };

            if let Some(name) = node.saved_variable() {
                ctx.variables.set_local(name, result.clone());
            }

            match node.op {
                OpTag::Branch => {
                    let index = if result == Value::Bool(true) { 0 } else { 1 };
                    if let Some(child) = node.children.get(index) {
                        self.visit(child, ctx, result).await;
                    }
                }
                OpTag::Switch | OpTag::SplitTest => {
                    let child = result
                        .as_i64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| node.children.get(i));
                    match child {
                        Some(child) => self.visit(child, ctx, result.clone()).await,
                        None => tracing::debug!(
                            flow_id = %ctx.flow_id,
                            slot_id = %node.slot_id,
                            selected = %result,
                            "no child selected"
                        ),
                    }
                }
                OpTag::Return => {
                    ctx.stopped = true;
                }
                _ => {
                    for child in &node.children {
                        if ctx.stopped {
                            break;
                        }
                        self.visit(child, ctx, result.clone()).await;
                    }
                }
            }
        })
    }

    async fn dispatch(
        &self,
        node: &Node,
        ctx: &mut ExecutionContext,
        prev: &Value,
    ) -> NodeResult<Value> {
        let env = self.env();
        match node.op {
            OpTag::Add
            | OpTag::Subtract
            | OpTag::Multiply
            | OpTag::Divide
            | OpTag::Power
            | OpTag::Modulo => math::arithmetic(node, ctx, prev, &env),
            OpTag::Ceil | OpTag::Floor | OpTag::Round => math::rounding(node, ctx, prev, &env),
            OpTag::Clamp => math::clamp(node, ctx, prev, &env),
            OpTag::Random => math::random(node, ctx, prev, &env),
            OpTag::SetVariable => variables::set_variable(node, ctx, prev, &env),
            OpTag::GetVariable => variables::get_variable(node, ctx, prev),
            OpTag::Branch => control_flow::branch(node, ctx, prev, &env),
            OpTag::Switch => control_flow::switch(node, ctx, prev),
            OpTag::SplitTest => control_flow::split_test(node, ctx, &env),
            OpTag::Sequence => Ok(prev.clone()),
            OpTag::Return => control_flow::return_value(node, ctx, prev),
            OpTag::SegmentAdd | OpTag::SegmentRemove => {
                player::segment_change(node, ctx, prev, &env)
            }
            OpTag::StatAdd | OpTag::StatSubtract | OpTag::StatSet => {
                player::stat_change(node, ctx, prev, &env)
            }
            OpTag::ApplyChange => apply_change::apply_change(node, ctx, prev, &env),
            OpTag::CallCustomFlow => self.call_custom_flow(node, ctx, prev).await,
            OpTag::ShowOffer => actions::show_offer(node, ctx, prev, &env),
            OpTag::SendEvent => actions::send_event(node, ctx, prev, &env),
            OpTag::RunCode => self.run_code(node, ctx, prev).await,
            // Trigger roots pass their seed through.
            OpTag::SessionStart
            | OpTag::CustomTrigger
            | OpTag::OfferShown
            | OpTag::ConfigParamRetrieved
            | OpTag::ItemAdded
            | OpTag::ItemRemoved
            | OpTag::StatChanged
            | OpTag::SegmentEnter
            | OpTag::SegmentExit
            | OpTag::AnalyticsEventSend => Ok(prev.clone()),
            OpTag::Unknown => Ok(Value::Null),
        }
    }

    fn env(&self) -> NodeEnv<'_> {
        NodeEnv {
            locale: self.locale,
            player: self.player.as_ref(),
            templates: self.templates.as_ref(),
            entities: self.entities.as_ref(),
            backend: &self.backend,
            credentials: &self.config.backend,
            random: self.random.as_ref(),
        }
    }

    /// `act_call_custom_flow`: run the flows of custom trigger `triggerId`
    /// one level deeper and return their local variables as an object.
    async fn call_custom_flow(
        &self,
        node: &Node,
        ctx: &ExecutionContext,
        prev: &Value,
    ) -> NodeResult<Value> {
        let trigger_id = id_param(node, "triggerId", ctx, prev)?;
        let depth = ctx.call_depth + 1;
        if depth > self.config.max_call_depth {
            return Err(NodeError::ValidationError(format!(
                "custom flow '{}' exceeds max call depth {}",
                trigger_id, self.config.max_call_depth
            )));
        }

        let dispatcher: &dyn CustomFlowDispatcher = match &self.custom_flows {
            Some(dispatcher) => dispatcher.as_ref(),
            None => self,
        };
        let locals = dispatcher
            .execute_flow_by_custom_trigger_id(&trigger_id, prev.clone(), depth)
            .await?;
        Ok(Value::Object(locals.into_iter().collect()))
    }

    #[cfg(feature = "builtin-sandbox-js")]
    async fn run_code(
        &self,
        node: &Node,
        ctx: &ExecutionContext,
        prev: &Value,
    ) -> NodeResult<Value> {
        crate::nodes::script::run_code(node, ctx, prev, &self.sandbox, self.config.script_timeout())
            .await
    }

    #[cfg(not(feature = "builtin-sandbox-js"))]
    async fn run_code(
        &self,
        _node: &Node,
        _ctx: &ExecutionContext,
        _prev: &Value,
    ) -> NodeResult<Value> {
        Err(NodeError::ValidationError(
            "act_run_code requires the builtin-sandbox-js feature".to_string(),
        ))
    }
}

#[async_trait]
impl CustomFlowDispatcher for FlowEngine {
    async fn execute_flow_by_custom_trigger_id(
        &self,
        trigger_id: &str,
        trigger_seed: Value,
        depth: u32,
    ) -> NodeResult<HashMap<String, Value>> {
        let invocation = FlowInvocation::new()
            .with_trigger_seed(trigger_seed)
            .at_depth(depth);
        Ok(self.run_custom_trigger(trigger_id, invocation).await.local_vars)
    }
}

// ================================
// Builder
// ================================

/// Builds a [`FlowEngine`]. Collaborators left unset get empty in-memory
/// implementations.
pub struct FlowEngineBuilder {
    config: EngineConfig,
    player: Option<Arc<dyn PlayerStore>>,
    templates: Option<Arc<dyn TemplateRegistry>>,
    entities: Option<Arc<dyn EntityRegistry>>,
    backend: Option<Arc<dyn BackendActionSender>>,
    flows: Option<Arc<dyn FlowRegistry>>,
    custom_flows: Option<Arc<dyn CustomFlowDispatcher>>,
    random: Option<Arc<dyn RandomSource>>,
    #[cfg(feature = "builtin-sandbox-js")]
    sandbox_config: Option<ScriptSandboxConfig>,
}

impl FlowEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            player: None,
            templates: None,
            entities: None,
            backend: None,
            flows: None,
            custom_flows: None,
            random: None,
            #[cfg(feature = "builtin-sandbox-js")]
            sandbox_config: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn player_store(mut self, player: Arc<dyn PlayerStore>) -> Self {
        self.player = Some(player);
        self
    }

    pub fn template_registry(mut self, templates: Arc<dyn TemplateRegistry>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn entity_registry(mut self, entities: Arc<dyn EntityRegistry>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn BackendActionSender>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn flow_registry(mut self, flows: Arc<dyn FlowRegistry>) -> Self {
        self.flows = Some(flows);
        self
    }

    pub fn custom_flow_dispatcher(mut self, dispatcher: Arc<dyn CustomFlowDispatcher>) -> Self {
        self.custom_flows = Some(dispatcher);
        self
    }

    pub fn random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    #[cfg(feature = "builtin-sandbox-js")]
    pub fn sandbox_config(mut self, config: ScriptSandboxConfig) -> Self {
        self.sandbox_config = Some(config);
        self
    }

    pub fn build(self) -> FlowEngine {
        let config = self.config;

        #[cfg(feature = "builtin-sandbox-js")]
        let sandbox = {
            let sandbox_config = self.sandbox_config.unwrap_or_else(|| ScriptSandboxConfig {
                watchdog_buffer: config.watchdog_buffer(),
                ..ScriptSandboxConfig::default()
            });
            Arc::new(ScriptSandbox::new(sandbox_config))
        };

        FlowEngine {
            locale: config.locale(),
            pool: ContextPool::new(config.pool_prewarm, config.pool_max_idle),
            player: self
                .player
                .unwrap_or_else(|| Arc::new(InMemoryPlayerStore::new())),
            templates: self
                .templates
                .unwrap_or_else(|| Arc::new(InMemoryTemplateRegistry::default())),
            entities: self
                .entities
                .unwrap_or_else(|| Arc::new(InMemoryEntityRegistry::new())),
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(RecordingBackend::new())),
            flows: self
                .flows
                .unwrap_or_else(|| Arc::new(InMemoryFlowRegistry::default())),
            custom_flows: self.custom_flows,
            random: self.random.unwrap_or_else(|| Arc::new(ThreadRandom)),
            #[cfg(feature = "builtin-sandbox-js")]
            sandbox,
            config,
        }
    }
}

impl Default for FlowEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
