//! Metric definitions for the relay.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

pub const REQUESTS: MetricDef = MetricDef {
    name: "requests",
    metric_type: MetricType::Counter,
    description: "Inbound requests handled. Tagged with status.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Inbound request duration in seconds.",
};

pub const FORWARD_ATTEMPTS: MetricDef = MetricDef {
    name: "forward.attempts",
    metric_type: MetricType::Counter,
    description: "Outbound delivery attempts, including retries.",
};

pub const FORWARD_FAILURES: MetricDef = MetricDef {
    name: "forward.failures",
    metric_type: MetricType::Counter,
    description: "Deliveries that ended in failure. Tagged with kind.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS,
    REQUEST_DURATION,
    FORWARD_ATTEMPTS,
    FORWARD_FAILURES,
];
