// Prometheus metrics for executed snippets

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref EXECUTIONS_TOTAL: IntCounterVec = {
        let counter = IntCounterVec::new(
            Opts::new("codexec_executions_total", "Executed snippets by language and outcome"),
            &["language", "status"],
        )
        .expect("valid counter definition");
        REGISTRY
            .register(Box::new(counter.clone()))
            .expect("counter registered once");
        counter
    };

    pub static ref EXECUTION_SECONDS: HistogramVec = {
        let histogram = HistogramVec::new(
            HistogramOpts::new("codexec_execution_seconds", "End-to-end execution latency")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["language"],
        )
        .expect("valid histogram definition");
        REGISTRY
            .register(Box::new(histogram.clone()))
            .expect("histogram registered once");
        histogram
    };
}

/// Record one finished execution
pub fn observe(language: &str, status: &str, elapsed: Duration) {
    EXECUTIONS_TOTAL.with_label_values(&[language, status]).inc();
    EXECUTION_SECONDS
        .with_label_values(&[language])
        .observe(elapsed.as_secs_f64());
}

/// Render the registry in Prometheus text format
pub fn export() -> Result<String, prometheus::Error> {
    // registration happens on first touch
    lazy_static::initialize(&EXECUTIONS_TOTAL);
    lazy_static::initialize(&EXECUTION_SECONDS);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
