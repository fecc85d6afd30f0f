use crate::model::{LogSource, Metric, ParseError};
use crate::sanitize::{sanitize_store_path, sanitize_url};
use crate::timestamp::{naive_utc_epoch, strip_subseconds};
use crate::traits::MetricParser;

const METRIC_NAME: &str = "couch.timings";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parser for the document-store access log.
///
/// Sample line:
/// `2015-10-31 18:32:03,963 [:mvp-pampaida] /a/mvp-pampaida/receiver/630916e49084b142c0a5a69c3a52b9b3/ PUT None d3abf611f2acdc7b4c32f7ebf4982a88 0:00:00.191515`
///
/// Newer log versions insert the database name after the url and the response
/// content length after the status code, so a line splits into 8, 9 or 10
/// whitespace-delimited tokens. Layouts are disambiguated by token count,
/// longest first.
pub struct CouchAccessParser;

impl MetricParser for CouchAccessParser {
    fn parse(&self, line: &str) -> Result<Vec<Metric>, ParseError> {
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }

        let record = parse_line(line)?;

        let mut metric = Metric::gauge(METRIC_NAME, record.timestamp, record.request_seconds)
            .with_tag("url", record.url)
            .with_tag("domain", record.domain)
            .with_tag("http_method", record.http_method)
            .with_tag("status_code", record.status_code)
            .with_tag("couch_url", record.couch_url);
        if let Some(database) = record.database {
            metric = metric.with_tag("database", database);
        }

        Ok(vec![metric])
    }

    fn source(&self) -> LogSource {
        LogSource::CouchAccess
    }
}

#[derive(Debug)]
struct CouchRecord {
    timestamp: i64,
    domain: String,
    url: String,
    database: Option<String>,
    http_method: String,
    status_code: String,
    couch_url: String,
    request_seconds: f64,
}

fn parse_line(line: &str) -> Result<CouchRecord, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    // Layouts by token count, longest first:
    // 10: date time [domain] url database method status length store_path duration
    //  9: database present, content length absent
    //  8: neither optional field
    let (has_database, has_content_length) = match tokens.len() {
        10 => (true, true),
        9 => (true, false),
        8 => (false, false),
        n => {
            return Err(ParseError::InvalidFormat(format!(
                "unexpected field count: {n}"
            )))
        }
    };
    let db = usize::from(has_database);
    let len = usize::from(has_content_length);

    let stamp = format!("{} {}", tokens[0], tokens[1]);
    let timestamp = naive_utc_epoch(strip_subseconds(&stamp), TIMESTAMP_FORMAT)?;

    Ok(CouchRecord {
        timestamp,
        domain: parse_domain_token(tokens[2]),
        url: sanitize_url(tokens[3]),
        database: has_database.then(|| tokens[4].to_string()),
        http_method: tokens[4 + db].to_string(),
        status_code: tokens[5 + db].to_string(),
        couch_url: sanitize_store_path(tokens[6 + db + len]),
        request_seconds: parse_request_time(tokens[7 + db + len])?,
    })
}

/// `[:mvp-pampaida]` -> `mvp-pampaida`. The prefix before the colon (when one
/// exists) is the logging component, not the tenant.
fn parse_domain_token(token: &str) -> String {
    let inner = token.trim_matches(|c| c == '[' || c == ']');
    match inner.rsplit(':').next() {
        Some(domain) => domain.to_string(),
        None => inner.to_string(),
    }
}

/// Elapsed time is either `H:MM:SS.ffffff` or a bare float in seconds.
fn parse_request_time(token: &str) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidDuration(token.to_string());

    match token.split(':').collect::<Vec<_>>().as_slice() {
        [hours, minutes, seconds] => {
            let hours: f64 = hours.parse().map_err(|_| invalid())?;
            let minutes: f64 = minutes.parse().map_err(|_| invalid())?;
            let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
            Ok(seconds + 60.0 * minutes + 3600.0 * hours)
        }
        [seconds] => seconds.parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
