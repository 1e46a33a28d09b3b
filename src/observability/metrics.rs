use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub rides_created_total: IntCounterVec,
    pub ride_transitions_total: IntCounterVec,
    pub fare_quote_latency_seconds: HistogramVec,
    pub captains_online: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let rides_created_total = IntCounterVec::new(
            Opts::new("rides_created_total", "Ride creation attempts by outcome"),
            &["outcome"],
        )
        .expect("valid rides_created_total metric");

        let ride_transitions_total = IntCounterVec::new(
            Opts::new(
                "ride_transitions_total",
                "Ride status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid ride_transitions_total metric");

        let fare_quote_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "fare_quote_latency_seconds",
                "Latency of fare quotes including the distance provider call",
            ),
            &["outcome"],
        )
        .expect("valid fare_quote_latency_seconds metric");

        let captains_online = IntGauge::new(
            "captains_online",
            "Number of captains currently flagged online",
        )
        .expect("valid captains_online metric");

        registry
            .register(Box::new(rides_created_total.clone()))
            .expect("register rides_created_total");
        registry
            .register(Box::new(ride_transitions_total.clone()))
            .expect("register ride_transitions_total");
        registry
            .register(Box::new(fare_quote_latency_seconds.clone()))
            .expect("register fare_quote_latency_seconds");
        registry
            .register(Box::new(captains_online.clone()))
            .expect("register captains_online");

        Self {
            registry,
            rides_created_total,
            ride_transitions_total,
            fare_quote_latency_seconds,
            captains_online,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
