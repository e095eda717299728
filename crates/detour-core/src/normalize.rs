//! Canonicalization of URLs and paths into comparable keys.
//!
//! Every key is trimmed of surrounding `/`. The root path is the one
//! exception: anything that trims down to nothing becomes `"/"`, so the
//! root stays usable as a lookup key.

use crate::error::NormalizeError;
use url::Url;

/// The key used for the root path.
pub const ROOT: &str = "/";

// Relative inputs are resolved against this so bare paths parse like URLs.
const PLACEHOLDER_BASE: &str = "http://localhost/";

/// Normalizes a source path or an internal destination.
///
/// `raw` may be an absolute URL, a scheme-relative URL or a bare path. The
/// `url` crate decides whether `raw` is well formed; the path component is
/// then kept exactly as written. The host, query and fragment are dropped.
/// Case, percent-escapes, dot segments and backslashes are left alone so a
/// request carrying the same path text matches.
pub fn normalize_internal(raw: &str) -> Result<String, NormalizeError> {
    if raw.trim().is_empty() {
        return Err(NormalizeError::Malformed("input is empty".to_string()));
    }

    let base = Url::parse(PLACEHOLDER_BASE)
        .map_err(|e| NormalizeError::Malformed(format!("invalid base url: {e}")))?;
    Url::options()
        .base_url(Some(&base))
        .parse(raw)
        .map_err(|e| NormalizeError::Malformed(format!("'{raw}': {e}")))?;

    Ok(trim_slashes(path_component(raw)))
}

/// Slices the path out of `raw` without rewriting it.
fn path_component(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let rest = &raw[..end];

    let rest = match rest.split_once(':') {
        Some((scheme, tail)) if is_scheme(scheme) => tail,
        _ => rest,
    };

    match rest.strip_prefix("//") {
        Some(authority) => authority.find('/').map_or("", |at| &authority[at..]),
        None => rest,
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Normalizes an external destination.
///
/// External destinations are opaque: they are only trimmed of surrounding
/// slashes and never parsed.
pub fn normalize_external(raw: &str) -> Result<String, NormalizeError> {
    if raw.is_empty() {
        return Err(NormalizeError::Malformed(
            "external destination is empty".to_string(),
        ));
    }

    Ok(trim_slashes(raw))
}

/// Normalizes an incoming request path into a lookup key.
///
/// `"/"` is used verbatim. The caller already supplies a path, so there is
/// no URL parsing here and this never fails.
pub fn normalize_request_path(path: &str) -> String {
    if path == ROOT {
        return ROOT.to_string();
    }
    trim_slashes(path)
}

fn trim_slashes(value: &str) -> String {
    match value.trim_matches('/') {
        "" => ROOT.to_string(),
        trimmed => trimmed.to_string(),
    }
}
