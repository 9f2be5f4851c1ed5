use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::execution_context::ExecutionContext;

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts allocated (pre-warm plus on-demand growth)
    pub created: u64,
    /// Checkouts served from the idle list
    pub reused: u64,
    /// Released contexts dropped because the idle list was full
    pub dropped: u64,
    /// Contexts currently idle
    pub idle: usize,
}

/// Reusable execution contexts.
///
/// `checkout` hands out an owned context and never blocks; the pool grows on
/// demand. `release` resets the context before it is parked, and keeps at most
/// `max_idle` of them.
pub struct ContextPool {
    idle: Mutex<Vec<ExecutionContext>>,
    max_idle: usize,
    created: AtomicU64,
    reused: AtomicU64,
    dropped: AtomicU64,
}

impl ContextPool {
    pub fn new(prewarm: usize, max_idle: usize) -> Self {
        let warm = prewarm.min(max_idle);
        let idle = (0..warm).map(|_| ExecutionContext::new()).collect();
        Self {
            idle: Mutex::new(idle),
            max_idle,
            created: AtomicU64::new(warm as u64),
            reused: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn checkout(&self) -> ExecutionContext {
        if let Some(ctx) = self.idle.lock().pop() {
            self.reused.fetch_add(1, Ordering::Relaxed);
            return ctx;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        ExecutionContext::new()
    }

    pub fn release(&self, mut ctx: ExecutionContext) {
        ctx.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            idle: self.idle_count(),
        }
    }
}
