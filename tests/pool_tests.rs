mod common;

use std::sync::Arc;

use serde_json::json;

use common::{add, save, session_flow, set_literal, HarnessBuilder};
use liveflow::{ContextPool, EngineConfig};

#[test]
fn test_released_context_comes_back_clean() {
    let pool = ContextPool::new(0, 2);
    let mut ctx = pool.checkout();
    ctx.flow_id = "dirty".into();
    ctx.stopped = true;
    ctx.call_depth = 3;
    ctx.variables.set_local("x", json!(1));
    ctx.variables.set_contextual("y", json!(2));
    pool.release(ctx);

    let ctx = pool.checkout();
    assert!(ctx.is_clean());
    assert_eq!(pool.stats().reused, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_are_isolated() {
    let h = HarnessBuilder::new()
        .config(EngineConfig {
            pool_prewarm: 2,
            pool_max_idle: 4,
            ..EngineConfig::default()
        })
        .build();
    let engine = Arc::new(h.engine);

    let mut handles = Vec::new();
    for i in 0..32 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let flow = session_flow(
                &format!("flow{}", i),
                vec![
                    add("sum", i as f64, 1.0).with_child(save("keep", "value")),
                    set_literal(&format!("own{}", i), &format!("own{}", i), json!(i)),
                ],
            );
            (i, engine.execute(&flow, None, None).await)
        }));
    }

    for handle in handles {
        let (i, locals) = handle.await.unwrap();
        assert_eq!(locals.len(), 2);
        assert_eq!(locals.get("value"), Some(&json!(i + 1)));
        assert_eq!(locals.get(&format!("own{}", i)), Some(&json!(i)));
    }

    let stats = engine.pool_stats();
    // Every checkout was served from the idle list or by growing the pool.
    assert_eq!(stats.reused + (stats.created - 2), 32);
    assert!(stats.idle <= 4);
    assert_eq!(stats.created, stats.idle as u64 + stats.dropped);
}
