use url::Url;

use super::error::CaptureError;

/// Base used to resolve bare paths such as `/dashboard`.
const PATH_BASE: &str = "http://localhost/";

/// Known framework markers, checked in order against the page's hint.
const FRAMEWORK_MARKERS: [(&str, &str); 8] = [
    ("__next", "next.js"),
    ("__nuxt", "nuxt"),
    ("ng-version", "angular"),
    ("angular", "angular"),
    ("react", "react"),
    ("data-v-", "vue"),
    ("vue", "vue"),
    ("svelte", "svelte"),
];

/// Path component of `url` with query and fragment removed.
///
/// Accepts absolute URLs and bare paths. Trailing slashes are dropped except
/// for the root path so `/a/` and `/a` share a pattern.
pub fn url_pattern(url: &str) -> Result<String, CaptureError> {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(PATH_BASE)
            .and_then(|base| base.join(url))
            .map_err(|e| CaptureError::InvalidUrl {
                url: url.to_string(),
                source: e,
            })?,
        Err(e) => {
            return Err(CaptureError::InvalidUrl {
                url: url.to_string(),
                source: e,
            });
        }
    };

    let path = parsed.path();
    let trimmed = path.trim_end_matches('/');
    Ok(if trimmed.is_empty() { "/".into() } else { trimmed.to_string() })
}

/// Map a page context's framework hint to a framework name.
///
/// The hint is whatever the page context could observe (global names,
/// root attributes, a name it detected itself); unrecognised hints are kept
/// as-is, and no hint yields `unknown`.
pub fn detect_framework(hint: Option<&str>) -> String {
    let hint = match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => h.to_lowercase(),
        None => return "unknown".into(),
    };

    FRAMEWORK_MARKERS
        .iter()
        .find(|(marker, _)| hint.contains(marker))
        .map(|(_, name)| name.to_string())
        .unwrap_or(hint)
}
