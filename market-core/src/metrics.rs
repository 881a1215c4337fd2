use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub enumerations: IntCounter,
    pub enumeration_failures: IntCounter,
    pub txs_submitted: IntCounter,
    pub txs_confirmed: IntCounter,
    pub txs_failed: IntCounter,
    pub pending_actions: IntGauge,
}

impl Metrics {
    pub fn new(registry: &Registry) -> Arc<Self> {
        let enumerations =
            IntCounter::with_opts(Opts::new("enumerations", "Completed ledger enumerations"))
                .unwrap();
        let enumeration_failures = IntCounter::with_opts(Opts::new(
            "enumeration_failures",
            "Enumerations discarded on read failure",
        ))
        .unwrap();
        let txs_submitted =
            IntCounter::with_opts(Opts::new("txs_submitted", "Transactions submitted")).unwrap();
        let txs_confirmed =
            IntCounter::with_opts(Opts::new("txs_confirmed", "Transactions confirmed")).unwrap();
        let txs_failed = IntCounter::with_opts(Opts::new(
            "txs_failed",
            "Transactions rejected, reverted, or lost",
        ))
        .unwrap();
        let pending_actions =
            IntGauge::with_opts(Opts::new("pending_actions", "In-flight write actions")).unwrap();
        registry.register(Box::new(enumerations.clone())).ok();
        registry
            .register(Box::new(enumeration_failures.clone()))
            .ok();
        registry.register(Box::new(txs_submitted.clone())).ok();
        registry.register(Box::new(txs_confirmed.clone())).ok();
        registry.register(Box::new(txs_failed.clone())).ok();
        registry.register(Box::new(pending_actions.clone())).ok();
        Arc::new(Self {
            enumerations,
            enumeration_failures,
            txs_submitted,
            txs_confirmed,
            txs_failed,
            pending_actions,
        })
    }
}
