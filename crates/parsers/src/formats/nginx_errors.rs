use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{LogSource, Metric, ParseError};
use crate::timestamp::naive_utc_epoch;
use crate::traits::MetricParser;

const METRIC_NAME: &str = "nginx.error_logs";
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

static HEADER_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<timestamp>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(?P<log_level>\w+)\]")
        .unwrap()
});

/// Known error signatures, checked in order; first match wins. Lines matching
/// none of them still count, under the `other` label.
static ERROR_TYPES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"connect\(\) failed \(111: Connection refused\) while connecting to upstream")
                .unwrap(),
            "connection_refused",
        ),
        (
            Regex::new(r"an upstream response is buffered to a temporary file").unwrap(),
            "buffer_to_file/upstream",
        ),
        (
            Regex::new(r"a client request body is buffered to a temporary file").unwrap(),
            "buffer_to_file/client",
        ),
    ]
});

/// Parser for the web-proxy error log.
///
/// Emits one counter per line, labeled with the severity from the header and
/// the first matching error signature.
pub struct NginxErrorParser;

impl MetricParser for NginxErrorParser {
    fn parse(&self, line: &str) -> Result<Vec<Metric>, ParseError> {
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }

        let caps = HEADER_RX
            .captures(line)
            .ok_or_else(|| ParseError::InvalidFormat("no error-log header".to_string()))?;
        let timestamp = naive_utc_epoch(&caps["timestamp"], TIMESTAMP_FORMAT)?;

        let error_type = ERROR_TYPES
            .iter()
            .find(|(pattern, _)| pattern.is_match(line))
            .map(|(_, label)| *label)
            .unwrap_or("other");

        Ok(vec![Metric::counter(METRIC_NAME, timestamp)
            .with_tag("log_level", &caps["log_level"])
            .with_tag("error_type", error_type)])
    }

    fn source(&self) -> LogSource {
        LogSource::NginxError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTION_REFUSED: &str = r#"2018/01/03 19:04:31 [error] 22548#22548: *16560854 connect() failed (111: Connection refused) while connecting to upstream, client: 123.12.123.12, server: www.commcarehq.org, request: "GET /a/dimagi/apps/view/ba37c12fd8c9ab8cff511e0a8d7db19b/current_version/ HTTP/2.0", upstream: "http://10.1.1.1:9010/a/dimagi/apps/view/ba37c12fd8c9ab8cff511e0a8d7db19b/current_version/", host: "www.commcarehq.org""#;
    const BUFFERED_UPSTREAM: &str = r#"2018/01/03 19:46:16 [warn] 22552#22552: *16562567 an upstream response is buffered to a temporary file /var/lib/nginx/proxy/9/22/0001234567 while reading upstream, client: 123.12.1.1, server: www.commcarehq.org, host: "www.commcarehq.org""#;
    const BUFFERED_CLIENT: &str = r#"2019/02/18 12:17:13 [warn] 20106#20106: *174576880 a client request body is buffered to a temporary file /var/lib/nginx/body/0028365258, client: 106.77.16.63, server: cas.commcarehq.org, host: "cas.commcarehq.org""#;

    fn parse_one(line: &str) -> Metric {
        let mut metrics = NginxErrorParser.parse(line).unwrap();
        assert_eq!(metrics.len(), 1);
        metrics.remove(0)
    }

    #[test]
    fn test_connection_refused() {
        let metric = parse_one(CONNECTION_REFUSED);
        assert_eq!(metric.name, "nginx.error_logs");
        // 2018-01-03 19:04:31 UTC
        assert_eq!(metric.timestamp, 1515006271);
        assert_eq!(metric.value, 1.0);
        assert_eq!(metric.tag("metric_type"), Some("counter"));
        assert_eq!(metric.tag("log_level"), Some("error"));
        assert_eq!(metric.tag("error_type"), Some("connection_refused"));
    }

    #[test]
    fn test_buffered_to_file_upstream() {
        let metric = parse_one(BUFFERED_UPSTREAM);
        assert_eq!(metric.timestamp, 1515008776);
        assert_eq!(metric.tag("log_level"), Some("warn"));
        assert_eq!(metric.tag("error_type"), Some("buffer_to_file/upstream"));
    }

    #[test]
    fn test_buffered_to_file_client() {
        let metric = parse_one(BUFFERED_CLIENT);
        assert_eq!(metric.timestamp, 1550492233);
        assert_eq!(metric.tag("log_level"), Some("warn"));
        assert_eq!(metric.tag("error_type"), Some("buffer_to_file/client"));
    }

    #[test]
    fn test_unknown_signature_counts_as_other() {
        let metric = parse_one("2018/01/03 19:04:31 [crit] 1#1: something nginx never said before");
        assert_eq!(metric.tag("log_level"), Some("crit"));
        assert_eq!(metric.tag("error_type"), Some("other"));
    }

    #[test]
    fn test_headerless_line_is_an_error() {
        assert!(NginxErrorParser.parse("Borked").is_err());
    }

    #[test]
    fn test_empty_line_is_silent() {
        assert!(NginxErrorParser.parse("").unwrap().is_empty());
    }
}
