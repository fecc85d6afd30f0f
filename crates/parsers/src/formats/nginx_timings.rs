//! Parser for the web-proxy combined access log.
//!
//! The richest of the four sources: every parsed line fans out into a request
//! counter, an Apdex gauge and a raw timing gauge. URLs are wildcard-
//! normalized and collapsed into a bounded set of endpoint groups before they
//! become tags.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{LogSource, Metric, ParseError};
use crate::sanitize::{sanitize_url, WILDCARD};
use crate::timestamp::offset_epoch;
use crate::traits::MetricParser;

const TIMING_METRIC: &str = "nginx.timings";
const APDEX_METRIC: &str = "nginx.apdex";
const REQUEST_METRIC: &str = "nginx.requests";
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Satisfied / tolerating ceilings in seconds.
const APDEX_THRESHOLDS: (f64, f64) = (3.0, 12.0);

/// Latency bands for the request counter's `duration` tag. Upper bounds are
/// exclusive; a request of exactly 1s lands in `lt_005s`.
const DURATION_BUCKETS: &[(f64, &str)] = &[
    (1.0, "lt_001s"),
    (5.0, "lt_005s"),
    (20.0, "lt_020s"),
    (120.0, "lt_120s"),
];
const OVERFLOW_BUCKET: &str = "over_120s";

/// Exact-match static pages.
const STATIC_GROUPS: &[(&str, &str)] = &[
    ("/home/", "/home/"),
    ("/pricing/", "/pricing/"),
    ("/accounts/login/", "login"),
];

/// Known subsystem prefixes.
const PREFIX_GROUPS: &[(&str, &str)] = &[("/formplayer/", "formplayer")];

/// Multimedia file paths, keyed by the media-type path segment.
const MM_GROUPS: &[(&str, &str)] = &[
    ("CommCareAudio", "mm/audio"),
    ("CommCareVideo", "mm/video"),
    ("CommCareImage", "mm/image"),
];

const DEFAULT_GROUP: &str = "other";

/// Line layouts tried in order, newest first. The url is matched greedily
/// because some clients put unescaped spaces in request paths; the trailing
/// referer only appears on newer log formats.
static LINE_RX: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![Regex::new(
        r"(?i)^\[(?P<timestamp>[^\]]+)\] ((?P<cache_status>[\w-]+) )?((?P<http_method>\w+) (?P<url>.+) (http/\d\.\d)) (?P<status_code>\d{3}) (?P<request_time>\d+\.?\d*)( (?P<referer>\S+))?",
    )
    .unwrap()]
});

static DOMAIN_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/a/(?P<domain>[0-9a-z-]+)").unwrap());

pub struct NginxAccessParser;

impl MetricParser for NginxAccessParser {
    fn parse(&self, line: &str) -> Result<Vec<Metric>, ParseError> {
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }

        let record = parse_line(line)?;
        if should_skip(&record.url) {
            return Ok(Vec::new());
        }

        let group = url_group(&record.url);

        let mut request = Metric::counter(REQUEST_METRIC, record.timestamp)
            .with_tag("http_method", record.http_method.as_str())
            .with_tag("status_code", record.status_code.as_str());
        if let Some(cache_status) = &record.cache_status {
            request = request.with_tag("cache_status", cache_status.as_str());
        }
        request = request
            .with_tag("url_group", group.as_str())
            .with_tag("duration", duration_bucket(record.request_time));
        if let Some(referer_group) = record.referer.as_deref().and_then(referer_group) {
            request = request.with_tag("referer_group", referer_group);
        }

        let apdex = Metric::gauge(
            APDEX_METRIC,
            record.timestamp,
            apdex_score(record.request_time),
        )
        .with_tag("http_method", record.http_method.as_str())
        .with_tag("status_code", record.status_code.as_str())
        .with_tag("url_group", group.as_str());

        let timing = Metric::gauge(TIMING_METRIC, record.timestamp, record.request_time)
            .with_tag("http_method", record.http_method.as_str())
            .with_tag("status_code", record.status_code.as_str())
            .with_tag("url_group", group.as_str());

        Ok(vec![request, apdex, timing])
    }

    fn source(&self) -> LogSource {
        LogSource::NginxAccess
    }
}

#[derive(Debug, Clone, PartialEq)]
struct AccessRecord {
    timestamp: i64,
    cache_status: Option<String>,
    http_method: String,
    url: String,
    status_code: String,
    request_time: f64,
    domain: String,
    referer: Option<String>,
}

fn parse_line(line: &str) -> Result<AccessRecord, ParseError> {
    let caps = LINE_RX
        .iter()
        .find_map(|rx| rx.captures(line))
        .ok_or_else(|| ParseError::InvalidFormat("no access-log layout matches".to_string()))?;

    let raw_url = &caps["url"];
    let request_time = caps["request_time"]
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidDuration(caps["request_time"].to_string()))?;

    Ok(AccessRecord {
        timestamp: offset_epoch(&caps["timestamp"], TIMESTAMP_FORMAT)?,
        cache_status: caps.name("cache_status").map(|m| m.as_str().to_string()),
        http_method: caps["http_method"].to_string(),
        url: sanitize_url(raw_url),
        status_code: caps["status_code"].to_string(),
        request_time,
        domain: extract_domain(raw_url),
        referer: caps.name("referer").map(|m| m.as_str().to_string()),
    })
}

/// Tenant slug from a `/a/<domain>/...` url, before wildcard normalization
/// erases it. Empty for urls outside a tenant space.
fn extract_domain(url: &str) -> String {
    DOMAIN_RX
        .captures(url)
        .map(|caps| caps["domain"].to_string())
        .unwrap_or_default()
}

/// Static assets are served straight from disk and would drown the request
/// metrics; they emit nothing at all.
fn should_skip(url: &str) -> bool {
    url.starts_with("/static/")
}

fn apdex_score(duration: f64) -> f64 {
    let (satisfied, tolerating) = APDEX_THRESHOLDS;
    if duration > tolerating {
        0.0
    } else if duration > satisfied {
        0.5
    } else {
        1.0
    }
}

fn duration_bucket(duration: f64) -> &'static str {
    DURATION_BUCKETS
        .iter()
        .find(|(limit, _)| duration < *limit)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(OVERFLOW_BUCKET)
}

/// Ordered first-match-wins classification rules; applied to sanitized urls.
const GROUP_RULES: &[fn(&str) -> Option<String>] = &[
    tenant_group,
    static_group,
    prefix_group,
    multimedia_group,
];

pub(crate) fn url_group(url: &str) -> String {
    GROUP_RULES
        .iter()
        .find_map(|rule| rule(url))
        .unwrap_or_else(|| DEFAULT_GROUP.to_string())
}

/// `/a/*/phone/<seg>` -> `phone/<seg>`, `/a/*/<seg>` -> `<seg>`.
fn tenant_group(url: &str) -> Option<String> {
    let prefix = format!("/a/{WILDCARD}");
    if !url.starts_with(&prefix) {
        return None;
    }
    let parts: Vec<&str> = url.split('/').collect();
    let group = match parts.get(3) {
        Some(group) if !group.is_empty() => *group,
        _ => return Some(DEFAULT_GROUP.to_string()),
    };
    if group == "phone" {
        if let Some(segment) = parts.get(4).filter(|s| !s.is_empty()) {
            return Some(format!("phone/{segment}"));
        }
    }
    Some(group.to_string())
}

fn static_group(url: &str) -> Option<String> {
    STATIC_GROUPS
        .iter()
        .find(|(page, _)| url == *page)
        .map(|(_, group)| group.to_string())
}

fn prefix_group(url: &str) -> Option<String> {
    PREFIX_GROUPS
        .iter()
        .find(|(prefix, _)| url.starts_with(prefix))
        .map(|(_, group)| group.to_string())
}

fn multimedia_group(url: &str) -> Option<String> {
    if !url.starts_with("/hq/multimedia/file/") {
        return None;
    }
    let media_type = url.split('/').nth(4).unwrap_or("");
    Some(
        MM_GROUPS
            .iter()
            .find(|(kind, _)| *kind == media_type)
            .map(|(_, group)| group.to_string())
            .unwrap_or_else(|| "mm/other".to_string()),
    )
}

/// Classify a referer with the same rules as the request url. The literal `-`
/// placeholder means "no referer" and yields no group at all.
fn referer_group(referer: &str) -> Option<String> {
    if referer == "-" {
        return None;
    }
    Some(url_group(&sanitize_url(strip_origin(referer))))
}

/// `https://host/path` -> `/path`; relative referers pass through unchanged.
fn strip_origin(referer: &str) -> &str {
    match referer.split_once("://") {
        Some((_, rest)) => match rest.find('/') {
            Some(index) => &rest[index..],
            None => "/",
        },
        None => referer,
    }
}
