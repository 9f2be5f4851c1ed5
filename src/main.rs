use std::sync::Arc;

use serde_json::{json, Map};

use liveflow::collaborators::in_memory::{
    InMemoryEntityRegistry, InMemoryFlowRegistry, InMemoryPlayerStore, InMemoryTemplateRegistry,
    RecordingBackend,
};
use liveflow::{parse_flows, FlowEngine, FlowFormat, OfferSnapshot, StatTemplate};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== LiveFlow demo ===\n");

    let json = r#"
[
  {
    "id": "welcome",
    "root": {
      "op": "t_session_start",
      "slotId": "root",
      "children": [
        {
          "op": "i_branch",
          "slotId": "is_rich",
          "params": {
            "conditions": [
              {
                "value1": {"value": "gold", "type": "number"},
                "value2": {"value": 100, "isLiteral": true},
                "operator": ">="
              }
            ]
          },
          "children": [
            {"op": "act_segment_add", "slotId": "tag_rich", "params": {"segmentId": "whales"}},
            {
              "op": "act_stat_add",
              "slotId": "gift",
              "params": {"statId": "gold", "value": {"value": 50, "isLiteral": true}},
              "children": [
                {"op": "ops_set_variable", "slotId": "keep", "params": {"name": "gifted", "value": {"value": "$previous"}}}
              ]
            }
          ]
        },
        {
          "op": "i_split_test",
          "slotId": "ab",
          "params": {
            "splits": [{"slotId": "control", "share": 50}, {"slotId": "variant", "share": 50}],
            "savedVariable": "bucket"
          }
        }
      ]
    }
  },
  {
    "id": "discount",
    "root": {
      "op": "t_offer_shown",
      "slotId": "root",
      "params": {"offerId": "starter_pack"},
      "children": [
        {
          "op": "act_apply_change",
          "slotId": "price",
          "params": {"fieldToSet": "offerPrice", "value": {"value": 4.99, "isLiteral": true}}
        }
      ]
    }
  }
]
"#;

    let flows = match parse_flows(json, FlowFormat::Json) {
        Ok(flows) => flows,
        Err(e) => {
            eprintln!("failed to parse flows: {}", e);
            return;
        }
    };

    let player = Arc::new(InMemoryPlayerStore::new().with_stat("gold", json!(20)));
    let backend = Arc::new(RecordingBackend::new());
    let engine = FlowEngine::builder()
        .player_store(player.clone())
        .template_registry(Arc::new(InMemoryTemplateRegistry::new(vec![
            StatTemplate::number("gold"),
        ])))
        .entity_registry(Arc::new(InMemoryEntityRegistry::new()))
        .backend(backend.clone())
        .flow_registry(Arc::new(InMemoryFlowRegistry::new(flows)))
        .build();

    let session = engine.on_session_start(Map::new()).await;
    println!("session start ran {:?}", session.flows_run);
    println!("  locals: {:?}", session.local_vars);

    let mut offer = OfferSnapshot::new("starter_pack");
    offer.price = json!(9.99);
    let shown = engine.on_offer_shown(offer).await;
    println!("offer shown ran {:?}", shown.flows_run);
    println!("  offer after flows: {:?}", shown.offer);

    // Let fire-and-forget backend calls land before printing them.
    tokio::task::yield_now().await;
    for action in backend.actions() {
        println!("backend <- {} {}", action.action, action.payload);
    }
    println!("\npool: {:?}", engine.pool_stats());
}
