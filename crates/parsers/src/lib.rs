//! Structured-metric extraction from server log lines.
//!
//! Each parser consumes one raw log line and produces zero or more normalized
//! metric tuples (name, unix timestamp, value, tags) ready for a time-series
//! backend. Parsers are pure functions of their input: no shared state, no
//! I/O, no ordering dependency between lines. Tailing the files and shipping
//! the metrics belong to the surrounding harness.
//!
//! # Architecture
//!
//! - `model.rs`: the `Metric` tuple, source/type enums, error type
//! - `traits.rs`: `MetricParser` and `DiagnosticSink` traits, the
//!   `extract_metrics` boundary function
//! - `sanitize.rs`: wildcard URL normalization for cardinality control
//! - `timestamp.rs`: log timestamp to unix-seconds conversion
//! - `formats/`: one parser implementation per upstream log source

pub mod formats;
pub mod model;
pub mod sanitize;
pub mod timestamp;
pub mod traits;
mod serde_utils;

// Re-export commonly used types
pub use formats::couch::CouchAccessParser;
pub use formats::nginx_errors::NginxErrorParser;
pub use formats::nginx_timings::NginxAccessParser;
pub use formats::touchforms::TouchformsParser;
pub use model::{LogSource, Metric, MetricType, ParseError};
pub use traits::{extract_metrics, DiagnosticSink, MetricParser, TracingSink};
