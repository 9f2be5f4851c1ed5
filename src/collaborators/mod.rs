//! Interfaces the engine consumes. Implementations live with the host; the
//! [`in_memory`] module provides simple ones for tests and demos.
//!
//! Stores are synchronous and serialise their own writes. Backend calls and
//! nested flow runs are async.

pub mod in_memory;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;

use crate::error::NodeResult;
use crate::flow::FlowDefinition;

pub use types::{
    BackendAction, BackendCredentials, ConfigValue, CustomData, EntityConfig, OfferSnapshot,
    StatTemplate, StatType,
};

/// Player profile: segments and stat values.
pub trait PlayerStore: Send + Sync {
    fn segments(&self) -> Vec<String>;

    fn has_segment(&self, segment_id: &str) -> bool {
        self.segments().iter().any(|s| s == segment_id)
    }

    fn add_segment(&self, segment_id: &str);

    fn remove_segment(&self, segment_id: &str);

    fn stat_value(&self, internal_id: &str) -> Option<Value>;

    fn set_stat_value(&self, internal_id: &str, value: Value);

    fn add_to_stat(&self, internal_id: &str, amount: f64);

    fn subtract_from_stat(&self, internal_id: &str, amount: f64);

    /// Called when a run starts for a flow whose auto segment the player holds.
    fn on_flow_entered(&self, _flow_id: &str) {}
}

/// Stat templates.
pub trait TemplateRegistry: Send + Sync {
    fn template_by_internal_id(&self, internal_id: &str) -> Option<StatTemplate>;

    fn templates(&self) -> Vec<StatTemplate>;
}

/// Offers, entities and cached media.
pub trait EntityRegistry: Send + Sync {
    fn offer_by_internal_id(&self, internal_id: &str) -> Option<OfferSnapshot>;

    fn entity_id_by_node_id(&self, node_id: &str) -> Option<String>;

    fn cached_media_exists(&self, name: &str) -> bool;

    /// Present an offer to the player.
    fn show_offer(&self, offer: &OfferSnapshot);
}

/// Backend calls. Best effort: the engine never waits on them.
#[async_trait]
pub trait BackendActionSender: Send + Sync {
    async fn send_action(&self, action: BackendAction) -> NodeResult<()>;
}

/// Runs custom-trigger flows on behalf of `act_call_custom_flow`.
///
/// The engine implements this itself; hosts can inject their own.
#[async_trait]
pub trait CustomFlowDispatcher: Send + Sync {
    async fn execute_flow_by_custom_trigger_id(
        &self,
        trigger_id: &str,
        trigger_seed: Value,
        depth: u32,
    ) -> NodeResult<HashMap<String, Value>>;
}

/// Registered flows.
pub trait FlowRegistry: Send + Sync {
    fn flows(&self) -> Vec<Arc<FlowDefinition>>;

    fn flow(&self, id: &str) -> Option<Arc<FlowDefinition>> {
        self.flows().into_iter().find(|f| f.id == id)
    }
}

/// Random numbers for split tests and `ops_random`.
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[min, max)`.
    fn next_f64(&self, min: f64, max: f64) -> f64;

    /// Uniform integer in `[min, max]`.
    fn next_int(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        let draw = self.next_f64(min as f64, max as f64 + 1.0).floor() as i64;
        draw.clamp(min, max)
    }
}

/// Thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self, min: f64, max: f64) -> f64 {
        // `gen_range` panics on NaN bounds, empty ranges and overflowing spans.
        if !(min < max && (max - min).is_finite()) {
            return min;
        }
        rand::thread_rng().gen_range(min..max)
    }

    fn next_int(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_ranges() {
        let rng = ThreadRandom;
        for _ in 0..1000 {
            let f = rng.next_f64(0.0, 100.0);
            assert!((0.0..100.0).contains(&f));
            let i = rng.next_int(1, 6);
            assert!((1..=6).contains(&i));
        }
        assert_eq!(rng.next_f64(5.0, 5.0), 5.0);
        assert_eq!(rng.next_int(3, 3), 3);
    }

    #[test]
    fn test_thread_random_degenerate_bounds() {
        let rng = ThreadRandom;
        assert!(rng.next_f64(f64::NAN, 10.0).is_nan());
        assert_eq!(rng.next_f64(0.0, f64::NAN), 0.0);
        assert_eq!(rng.next_f64(0.0, f64::INFINITY), 0.0);
        assert_eq!(rng.next_f64(-1e308, 1e308), -1e308);
    }
}
