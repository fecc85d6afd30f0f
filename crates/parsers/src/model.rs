use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde_utils::{deserialize_tags_from_map, serialize_tags_as_map};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    /// Document-store access log
    CouchAccess,
    /// Web-proxy combined access log with request timings
    NginxAccess,
    /// Web-proxy error log
    NginxError,
    /// Forms-engine application log
    Touchforms,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::CouchAccess => "couch_access",
            LogSource::NginxAccess => "nginx_access",
            LogSource::NginxError => "nginx_error",
            LogSource::Touchforms => "touchforms",
        }
    }
}

/// Whether a metric value is a point-in-time sample or an occurrence count.
///
/// The distinction travels with the metric as a `metric_type` tag so the
/// delivery layer does not need a side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),
}

/// One normalized metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Dotted metric namespace, e.g. `nginx.timings`
    pub name: String,

    /// Event time in UTC unix seconds, taken from the log line itself
    pub timestamp: i64,

    /// Duration in seconds, an Apdex score, or 1 for counters
    pub value: f64,

    /// Dimension labels (insertion-ordered key-value pairs)
    /// Serialized as a JSON object for efficient downstream processing
    #[serde(
        serialize_with = "serialize_tags_as_map",
        deserialize_with = "deserialize_tags_from_map"
    )]
    pub tags: Vec<(String, String)>,
}

impl Metric {
    /// Create a gauge sample with the `metric_type` tag already set.
    pub fn gauge(name: &str, timestamp: i64, value: f64) -> Self {
        Self::new(name, timestamp, value, MetricType::Gauge)
    }

    /// Create a counter increment (value fixed at 1).
    pub fn counter(name: &str, timestamp: i64) -> Self {
        Self::new(name, timestamp, 1.0, MetricType::Counter)
    }

    fn new(name: &str, timestamp: i64, value: f64, metric_type: MetricType) -> Self {
        Self {
            name: name.to_string(),
            timestamp,
            value,
            tags: vec![("metric_type".to_string(), metric_type.as_str().to_string())],
        }
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags.push((key.to_string(), value.into()));
        self
    }

    /// Look up a tag by key (linear scan; tag sets stay small).
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
