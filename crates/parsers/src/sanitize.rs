//! Wildcard normalization of high-cardinality URL segments.
//!
//! Raw request URLs embed tenant slugs, document ids and UUIDs; used directly
//! as metric tags they would explode series cardinality. The rules below
//! collapse every variable segment to a fixed `*` placeholder. Rules are kept
//! as an ordered replacement table so new id shapes are added by appending a
//! row.

use once_cell::sync::Lazy;
use regex::Regex;

pub const WILDCARD: &str = "*";

/// Request-url rules, applied in order. The specific path rules run before
/// the catch-all hex rule so e.g. `/modules-3` keeps its own wildcard shape.
static URL_RULES: Lazy<Vec<(Regex, String)>> = Lazy::new(|| {
    vec![
        // Tenant slug
        (
            Regex::new(r"/a/[0-9a-z-]+").unwrap(),
            format!("/a/{WILDCARD}"),
        ),
        // Indexed app modules and forms
        (
            Regex::new(r"/modules-[0-9]+").unwrap(),
            format!("/modules-{WILDCARD}"),
        ),
        (
            Regex::new(r"/forms-[0-9]+").unwrap(),
            format!("/forms-{WILDCARD}"),
        ),
        // Form submission and instance ids
        (
            Regex::new(r"/form_data/[a-z0-9-]+").unwrap(),
            format!("/form_data/{WILDCARD}"),
        ),
        (
            Regex::new(r"/uuid:[a-z0-9-]+").unwrap(),
            format!("/uuid:{WILDCARD}"),
        ),
        // Any remaining hex-ish run: 32-char doc ids, dashed UUIDs, long
        // numeric indexes
        (
            Regex::new(r"[-0-9a-f]{10,}").unwrap(),
            WILDCARD.to_string(),
        ),
        // Query string
        (Regex::new(r"\?[^ ]*").unwrap(), String::new()),
    ]
});

/// Store-internal path rules: document ids, view index numbers, query.
static STORE_PATH_RULES: Lazy<Vec<(Regex, String)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"[-0-9a-f]{10,}").unwrap(),
            WILDCARD.to_string(),
        ),
        (
            Regex::new(r"/[0-9]+").unwrap(),
            format!("/{WILDCARD}"),
        ),
        (Regex::new(r"\?[^ ]*").unwrap(), String::new()),
    ]
});

fn apply(rules: &[(Regex, String)], input: &str) -> String {
    rules.iter().fold(input.to_string(), |value, (pattern, replacement)| {
        pattern.replace_all(&value, replacement.as_str()).into_owned()
    })
}

/// Collapse variable request-url segments into `*` and strip the query string.
pub fn sanitize_url(url: &str) -> String {
    apply(&URL_RULES, url)
}

/// Collapse document ids and index numbers in a document-store internal path.
pub fn sanitize_store_path(path: &str) -> String {
    apply(&STORE_PATH_RULES, path)
}
