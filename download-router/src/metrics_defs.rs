use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Time until the response head is ready in seconds. Tagged with status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const DOWNLOADS: MetricDef = MetricDef {
    name: "downloads",
    metric_type: MetricType::Counter,
    description: "Number of authorized downloads. Tagged with platform, delivery.",
};

pub const ARTIFACT_BYTES: MetricDef = MetricDef {
    name: "artifact.bytes",
    metric_type: MetricType::Histogram,
    description: "Bytes relayed per artifact download",
};

pub const ARTIFACT_STREAM_INTERRUPTED: MetricDef = MetricDef {
    name: "artifact.stream.interrupted",
    metric_type: MetricType::Counter,
    description: "Artifact downloads that failed or were abandoned after the headers were sent",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    DOWNLOADS,
    ARTIFACT_BYTES,
    ARTIFACT_STREAM_INTERRUPTED,
];
