use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use prometheus::{HistogramVec, IntCounterVec, Registry};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub timeout_ms: u64,
    pub max_connections: usize,
    /// Interval between receipt polls while awaiting confirmation. There is
    /// no overall deadline; an unresolved transaction suspends its caller.
    pub receipt_poll_ms: u64,
}

impl Default for EthConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31_337,
            timeout_ms: 10_000,
            max_connections: 8,
            receipt_poll_ms: 1_000,
        }
    }
}

/// JSON-RPC error object as returned by the provider.
#[derive(Debug, Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum RpcFailure {
    #[error(transparent)]
    Rpc(#[from] RpcErrorObject),
    #[error("transport: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Instrumented JSON-RPC client over a single provider endpoint.
pub struct RpcPool {
    client: Client,
    endpoint: Url,
    metrics: Arc<RpcMetrics>,
    next_id: AtomicU64,
}

impl RpcPool {
    pub fn new(cfg: &EthConfig, registry: &Registry) -> Result<Self> {
        let client = ClientBuilder::new()
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(cfg.max_connections)
            .connect_timeout(Duration::from_millis(cfg.timeout_ms))
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("build reqwest client")?;
        let endpoint = Url::parse(&cfg.rpc_url).context("parse rpc url")?;
        Ok(Self {
            client,
            endpoint,
            metrics: Arc::new(RpcMetrics::new(registry)),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let start = Instant::now();
        self.metrics.req_total.with_label_values(&[method]).inc();

        let sent = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await;
        let resp = match sent {
            Ok(resp) => resp,
            Err(err) => {
                self.metrics.fail_total.with_label_values(&[method]).inc();
                tracing::warn!(target: "rpc", method = %method, error = %err, "rpc send failed");
                return Err(RpcFailure::Transport(anyhow!(err).context("rpc send")));
            }
        };
        let js: Value = match resp.json().await {
            Ok(js) => js,
            Err(err) => {
                self.metrics.fail_total.with_label_values(&[method]).inc();
                return Err(RpcFailure::Transport(
                    anyhow!(err).context("rpc response body"),
                ));
            }
        };

        let dur = start.elapsed().as_secs_f64();
        self.metrics
            .latency
            .with_label_values(&[method])
            .observe(dur);

        if let Some(err) = js.get("error") {
            self.metrics.fail_total.with_label_values(&[method]).inc();
            let code = err.get("code").and_then(|v| v.as_i64()).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown rpc error")
                .to_string();
            tracing::warn!(target: "rpc", method = %method, code = code, message = %message, "rpc error");
            return Err(RpcFailure::Rpc(RpcErrorObject { code, message }));
        }

        let dur_ms = (dur * 1000.0) as u64;
        tracing::debug!(target: "rpc", method = %method, id = id, latency_ms = dur_ms, "rpc call completed");
        Ok(js.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[derive(Clone)]
struct RpcMetrics {
    req_total: IntCounterVec,
    fail_total: IntCounterVec,
    latency: HistogramVec,
}

impl RpcMetrics {
    fn new(registry: &Registry) -> Self {
        let req_total = IntCounterVec::new(
            prometheus::Opts::new("rpc_requests_total", "JSON-RPC requests total"),
            &["method"],
        )
        .unwrap();
        let fail_total = IntCounterVec::new(
            prometheus::Opts::new("rpc_failures_total", "JSON-RPC failures total"),
            &["method"],
        )
        .unwrap();
        let latency = HistogramVec::new(
            prometheus::HistogramOpts::new("rpc_latency_seconds", "JSON-RPC latency seconds")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method"],
        )
        .unwrap();
        registry.register(Box::new(req_total.clone())).ok();
        registry.register(Box::new(fail_total.clone())).ok();
        registry.register(Box::new(latency.clone())).ok();
        Self {
            req_total,
            fail_total,
            latency,
        }
    }
}
