//! Metrics definitions for the build directory.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UNKNOWN_BUILD_HIT: MetricDef = MetricDef {
    name: "build_directory.unknown_builds.hit",
    metric_type: MetricType::Counter,
    description: "Number of lookups rejected because the build was recently reported missing",
};

pub const UNKNOWN_BUILD_MISS: MetricDef = MetricDef {
    name: "build_directory.unknown_builds.miss",
    metric_type: MetricType::Counter,
    description: "Number of lookups for names not recently reported missing",
};

pub const CACHE_MISS: MetricDef = MetricDef {
    name: "build_directory.cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of build lookups that had to query the orchestrator directly",
};

pub const SYNC_DURATION: MetricDef = MetricDef {
    name: "build_directory.sync.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a full build listing from the orchestrator in seconds",
};

pub const SYNC_BUILDS: MetricDef = MetricDef {
    name: "build_directory.sync.builds",
    metric_type: MetricType::Histogram,
    description: "Number of builds returned by a full listing",
};

pub const SYNC_FAILURES: MetricDef = MetricDef {
    name: "build_directory.sync.failures",
    metric_type: MetricType::Counter,
    description: "Number of failed build listings",
};

pub const ALL_METRICS: &[MetricDef] = &[
    UNKNOWN_BUILD_HIT,
    UNKNOWN_BUILD_MISS,
    CACHE_MISS,
    SYNC_DURATION,
    SYNC_BUILDS,
    SYNC_FAILURES,
];
