use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub eval_ticks: Arc<AtomicU64>,
    pub opportunities: Arc<AtomicU64>,

    pub cycles_completed: Arc<AtomicU64>,
    pub cycles_rejected: Arc<AtomicU64>,

    // failure reasons
    pub build_failures: Arc<AtomicU64>,
    pub submit_failures: Arc<AtomicU64>,
}
