//! Prometheus metrics for the faucet

use crate::error::{FaucetError, FaucetResult};
use faucet_common::types::Amount;
use prometheus::{Counter, Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Mutex;

/// Outcome label for a successful dispense.
pub const OUTCOME_DISPENSED: &str = "dispensed";

/// Metrics owned by one service instance, each with its own registry.
pub struct FaucetMetrics {
    registry: Registry,
    requests: IntCounterVec,
    dispensed_wei: Counter,
    last_gas_price: Gauge,
    cache_entries: IntGauge,
    // Exact running total; the float counter above is for dashboards.
    total_dispensed: Mutex<Amount>,
}

impl FaucetMetrics {
    pub fn new() -> FaucetResult<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("faucet_requests_total", "Dispense requests by outcome"),
            &["outcome"], // dispensed | invalid_address | rate_limited | greedy | upstream | ...
        )
        .map_err(metrics_error)?;
        let dispensed_wei = Counter::new("faucet_dispensed_wei_total", "Wei sent by the faucet")
            .map_err(metrics_error)?;
        let last_gas_price = Gauge::new("faucet_last_gas_price_wei", "Gas price used for the last submission")
            .map_err(metrics_error)?;
        let cache_entries = IntGauge::new("faucet_abuse_cache_entries", "Addresses held in the abuse cache")
            .map_err(metrics_error)?;

        registry.register(Box::new(requests.clone())).map_err(metrics_error)?;
        registry.register(Box::new(dispensed_wei.clone())).map_err(metrics_error)?;
        registry.register(Box::new(last_gas_price.clone())).map_err(metrics_error)?;
        registry.register(Box::new(cache_entries.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            requests,
            dispensed_wei,
            last_gas_price,
            cache_entries,
            total_dispensed: Mutex::new(Amount::zero()),
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.requests.with_label_values(&[outcome]).inc();
    }

    pub fn record_dispense(&self, amount: &Amount) {
        self.record_outcome(OUTCOME_DISPENSED);
        self.dispensed_wei.inc_by(amount.to_f64_lossy());
        let mut total = self.total_dispensed.lock().unwrap_or_else(|e| e.into_inner());
        *total = &*total + amount;
    }

    pub fn set_gas_price(&self, price: &Amount) {
        self.last_gas_price.set(price.to_f64_lossy());
    }

    pub fn set_cache_entries(&self, entries: u64) {
        self.cache_entries.set(i64::try_from(entries).unwrap_or(i64::MAX));
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.requests.with_label_values(&[outcome]).get()
    }

    /// Requests that did not end in a transfer.
    pub fn rejected_count(&self) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == "faucet_requests_total")
            .flat_map(|family| family.get_metric().iter())
            .filter(|metric| {
                metric
                    .get_label()
                    .iter()
                    .all(|label| label.get_value() != OUTCOME_DISPENSED)
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }

    pub fn total_dispensed(&self) -> Amount {
        self.total_dispensed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Render in the Prometheus text exposition format.
    pub fn gather_text(&self) -> FaucetResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| FaucetError::Internal(e.to_string()))
    }
}

fn metrics_error(e: prometheus::Error) -> FaucetError {
    FaucetError::Internal(format!("metrics: {}", e))
}
