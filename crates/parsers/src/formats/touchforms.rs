use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{LogSource, Metric, ParseError};
use crate::timestamp::{naive_utc_epoch, strip_subseconds};
use crate::traits::MetricParser;

const METRIC_NAME: &str = "touchforms.timings";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Only action-completion lines carry a duration; everything else the forms
/// engine logs is skipped without a diagnostic.
const MARKER: &str = "Finished processing action";

static ACTION_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"action (?P<action>[\w-]+)").unwrap());
static DURATION_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<milliseconds>[0-9.]+) ms ").unwrap());
static DOMAIN_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"domain '(?P<domain>[-_\w]+)'").unwrap());

/// Parser for the forms-engine application log.
///
/// Sample line:
/// `INFO 2015-11-12 16:39:39,605 xformserver 20514 27 Finished processing action submit-all in 6.99996948242 ms for session 002734587f774dadbccb96e5f4453546 in domain 'aspace'`
pub struct TouchformsParser;

impl MetricParser for TouchformsParser {
    fn parse(&self, line: &str) -> Result<Vec<Metric>, ParseError> {
        if line.trim().is_empty() || !line.contains(MARKER) {
            return Ok(Vec::new());
        }

        let (timestamp, action, domain, request_seconds) = parse_line(line)?;

        Ok(vec![Metric::gauge(METRIC_NAME, timestamp, request_seconds)
            .with_tag("action", action)
            .with_tag("domain", domain)])
    }

    fn source(&self) -> LogSource {
        LogSource::Touchforms
    }
}

fn parse_line(line: &str) -> Result<(i64, String, String, f64), ParseError> {
    let caps = ACTION_RX
        .captures(line)
        .ok_or_else(|| ParseError::InvalidFormat("missing action name".to_string()))?;
    let action = caps["action"].to_string();

    let caps = DURATION_RX
        .captures(line)
        .ok_or_else(|| ParseError::InvalidFormat("missing millisecond duration".to_string()))?;
    let request_seconds = caps["milliseconds"]
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidDuration(caps["milliseconds"].to_string()))?
        / 1000.0;

    let caps = DOMAIN_RX
        .captures(line)
        .ok_or_else(|| ParseError::InvalidFormat("missing domain".to_string()))?;
    let domain = caps["domain"].to_string();

    // The second and third whitespace tokens are the date and time
    let mut parts = line.split_whitespace();
    let date = parts
        .nth(1)
        .ok_or_else(|| ParseError::InvalidFormat("missing date token".to_string()))?;
    let time = parts
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("missing time token".to_string()))?;
    let stamp = format!("{date} {time}");
    let timestamp = naive_utc_epoch(strip_subseconds(&stamp), TIMESTAMP_FORMAT)?;

    Ok((timestamp, action, domain, request_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "INFO 2015-11-12 16:39:39,605 xformserver 20514 27 Finished processing action submit-all in 6.99996948242 ms for session 002734587f774dadbccb96e5f4453546 in domain 'aspace'";
    const SKIPPED: &str = "INFO 2015-11-12 16:39:39,598 xformplayer 20514 27 [locking] requested lock for session 002734587f774dadbccb96e5f4453546";

    #[test]
    fn test_basic_log_parsing() {
        let metrics = TouchformsParser.parse(SIMPLE).unwrap();
        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];

        assert_eq!(metric.name, "touchforms.timings");
        // 2015-11-12 16:39:39 UTC
        assert_eq!(metric.timestamp, 1447346379);
        assert_eq!(metric.value, 6.99996948242 / 1000.0);
        assert_eq!(metric.tag("metric_type"), Some("gauge"));
        assert_eq!(metric.tag("action"), Some("submit-all"));
        assert_eq!(metric.tag("domain"), Some("aspace"));
    }

    #[test]
    fn test_locking_line_is_skipped() {
        assert!(TouchformsParser.parse(SKIPPED).unwrap().is_empty());
    }

    #[test]
    fn test_empty_line_is_silent() {
        assert!(TouchformsParser.parse("").unwrap().is_empty());
    }

    #[test]
    fn test_marker_without_fields_is_an_error() {
        // Marker present but the surrounding fields are mangled
        assert!(TouchformsParser
            .parse("Finished processing action")
            .is_err());
    }

    #[test]
    fn test_underscore_domain() {
        let line = "INFO 2015-11-12 16:39:39,605 xformserver 20514 27 Finished processing action new-form in 12.5 ms for session abc in domain 'my_domain'";
        let metrics = TouchformsParser.parse(line).unwrap();
        assert_eq!(metrics[0].tag("domain"), Some("my_domain"));
        assert_eq!(metrics[0].value, 0.0125);
    }
}
