//! Mediatype negotiation.
//!
//! Entries are considered in the order the client wrote them, not by
//! quality value: the first entry that names a supported mediatype wins.

/// Picks the mediatype to answer with.
///
/// Matching runs in three passes over the `Accept` entries:
///
/// 1. an entry equal to a supported mediatype;
/// 2. an entry whose part before `;` equals a supported mediatype
///    (`application/json; charset=utf-8` → `application/json`);
/// 3. any wildcard entry (`*`, `*/*`, `*.*`) selects `default`.
///
/// No match, a missing header, or an empty `supported` set all return
/// `default`, which may itself be `None`.
///
/// ```rust
/// use tsu_restful::best_match;
///
/// let supported = ["application/json", "application/xml"];
/// assert_eq!(
///     best_match(Some("text/html, application/xml;q=0.9"), &supported, Some("application/json")),
///     Some("application/xml".to_owned()),
/// );
/// assert_eq!(best_match(Some("*/*"), &supported, None), None);
/// ```
pub fn best_match<S: AsRef<str>>(
    accept: Option<&str>,
    supported: &[S],
    default: Option<&str>,
) -> Option<String> {
    let fallback = || default.map(str::to_owned);
    if supported.is_empty() {
        return fallback();
    }
    let Some(accept) = accept else {
        return fallback();
    };
    let entries: Vec<&str> = accept.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();

    let lookup = |candidate: &str| {
        supported.iter()
            .map(|s| s.as_ref())
            .find(|s| *s == candidate)
            .map(str::to_owned)
    };

    if let Some(hit) = entries.iter().find_map(|&e| lookup(e)) {
        return Some(hit);
    }
    if let Some(hit) = entries.iter().find_map(|&e| lookup(strip_params(e))) {
        return Some(hit);
    }
    // Wildcards and misses both land on the default.
    fallback()
}

fn strip_params(entry: &str) -> &str {
    entry.split(';').next().unwrap_or(entry).trim()
}
