mod common;

use serde_json::json;

use common::{session_flow, set_literal, HarnessBuilder};
use liveflow::evaluator::sticky_key;
use liveflow::{Node, OpTag, PlayerStore};

fn ab_flow() -> liveflow::FlowDefinition {
    session_flow(
        "promo",
        vec![Node::new(OpTag::SplitTest, "ab")
            .with_param(
                "splits",
                json!([{"slotId": "control", "share": 50}, {"slotId": "variant", "share": 50}]),
            )
            .with_param("savedVariable", "bucket")
            .with_children([
                set_literal("c", "arm", json!("control")),
                set_literal("v", "arm", json!("variant")),
            ])],
    )
}

#[tokio::test]
async fn test_assignment_is_sticky() {
    let h = HarnessBuilder::new().build();
    let flow = ab_flow();

    let first = h.engine.execute(&flow, None, None).await;
    let arm = first.get("arm").cloned().unwrap();
    for _ in 0..20 {
        let again = h.engine.execute(&flow, None, None).await;
        assert_eq!(again.get("arm"), Some(&arm));
    }

    let slot = if arm == json!("control") { "control" } else { "variant" };
    assert!(h.player.has_segment(&sticky_key("promo", "ab", slot)));
    common::settle().await;
    assert_eq!(h.backend.actions_named("addSegment").len(), 1);
}

#[tokio::test]
async fn test_even_split_distribution() {
    let h = HarnessBuilder::new().build();
    let flow = ab_flow();
    let control = sticky_key("promo", "ab", "control");
    let variant = sticky_key("promo", "ab", "variant");

    let runs = 10_000;
    let mut control_hits = 0;
    for _ in 0..runs {
        let locals = h.engine.execute(&flow, None, None).await;
        if locals.get("bucket") == Some(&json!(0)) {
            control_hits += 1;
        }
        h.player.remove_segment(&control);
        h.player.remove_segment(&variant);
    }

    let share = control_hits as f64 / runs as f64;
    assert!((0.45..=0.55).contains(&share), "control share {}", share);
}

#[tokio::test]
async fn test_zero_share_split_never_drawn() {
    let flow = session_flow(
        "promo",
        vec![Node::new(OpTag::SplitTest, "ab")
            .with_param(
                "splits",
                json!([{"slotId": "off", "share": 0}, {"slotId": "on", "share": 10}]),
            )
            .with_param("savedVariable", "bucket")],
    );
    let h = HarnessBuilder::new().build();

    for _ in 0..200 {
        let locals = h.engine.execute(&flow, None, None).await;
        assert_eq!(locals.get("bucket"), Some(&json!(1)));
        h.player.remove_segment(&sticky_key("promo", "ab", "on"));
    }
}
