pub use super::model::{LogSource, Metric, ParseError};

/// One log source's line parser.
///
/// `parse` is total over well-formed lines: empty input and intentionally
/// skipped lines yield `Ok` with no metrics, structural mismatches yield
/// `Err`. Parsers hold no mutable state and are safe to call from any number
/// of workers concurrently.
pub trait MetricParser: Send + Sync {
    /// Parse one raw log line into zero or more metric samples.
    fn parse(&self, line: &str) -> Result<Vec<Metric>, ParseError>;
    fn source(&self) -> LogSource;
}

/// Where structural parse failures are reported.
///
/// Injected rather than ambient so the parsing core carries no global logging
/// dependency. Any `Fn(&str, &ParseError)` closure qualifies.
pub trait DiagnosticSink {
    fn parse_failure(&self, line: &str, error: &ParseError);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str, &ParseError),
{
    fn parse_failure(&self, line: &str, error: &ParseError) {
        self(line, error)
    }
}

/// Sink that reports failures through `tracing`.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn parse_failure(&self, line: &str, error: &ParseError) {
        tracing::warn!(error = %error, line, "failed to parse log line");
    }
}

/// The public boundary shared by all parsers: no failure propagates past it.
///
/// A structural failure is reported once to the sink and becomes an empty
/// result; empty input and skipped lines come back empty without touching the
/// sink. Re-invoking with the same line always yields the same metrics.
pub fn extract_metrics(
    parser: &dyn MetricParser,
    sink: &dyn DiagnosticSink,
    line: &str,
) -> Vec<Metric> {
    match parser.parse(line) {
        Ok(metrics) => metrics,
        Err(error) => {
            sink.parse_failure(line, &error);
            Vec::new()
        }
    }
}
