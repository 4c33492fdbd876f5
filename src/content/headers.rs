//! Response headers shared by every served artifact

use http::header::{
    CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, STRICT_TRANSPORT_SECURITY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};

use crate::config::ONE_YEAR;

pub const X_ERROR_DETAILS: &str = "x-error-details";

pub const HTML_UTF8: &str = "text/html; charset=utf-8";

/// Applies the cross-origin isolation and hardening headers
pub fn apply_default_headers(headers: &mut HeaderMap) {
    let fixed: [(&'static str, &'static str); 3] = [
        ("cross-origin-opener-policy", "same-origin"),
        ("cross-origin-embedder-policy", "require-corp"),
        ("cross-origin-resource-policy", "same-origin"),
    ];
    for (name, value) in fixed {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    if let Ok(hsts) = HeaderValue::from_str(&format!("max-age={}", ONE_YEAR.as_secs())) {
        headers.insert(STRICT_TRANSPORT_SECURITY, hsts);
    }
}

/// Sets the content type derived from the file name, if it is known
pub fn apply_content_type(headers: &mut HeaderMap, filename: &str) {
    if let Some(content_type) = content_type_for(filename)
        && let Ok(value) = HeaderValue::from_str(&content_type)
    {
        headers.insert(CONTENT_TYPE, value);
    }
}

/// Content type by file extension; text types carry an explicit charset
pub fn content_type_for(filename: &str) -> Option<String> {
    let mime = mime_guess::from_path(filename).first()?;
    Some(if mime.type_() == mime_guess::mime::TEXT {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    })
}
