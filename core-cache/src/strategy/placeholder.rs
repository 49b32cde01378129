//! Synthetic responses served when neither network nor storage can answer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::HttpResponse;
use core_runtime::config::LargeStaticPlaceholder;

const TRANSPARENT_GIF: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

const OFFLINE_PAGE: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<title>Offline</title></head><body><h1>Offline</h1>\
<p>This page could not be loaded. Check your network connection.</p></body></html>";

pub fn offline_page() -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Type", "text/html; charset=utf-8")
        .with_body(OFFLINE_PAGE)
}

pub fn not_found() -> HttpResponse {
    HttpResponse::new(404)
}

/// 503 with a JSON `{"error": ...}` body for data the page cannot do without.
pub fn data_unavailable() -> HttpResponse {
    let body = serde_json::json!({
        "error": "Data could not be loaded. Check your network connection."
    });
    HttpResponse::new(503)
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

/// 1×1 transparent GIF for image requests.
pub fn transparent_gif() -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Type", "image/gif")
        .with_body(STANDARD.decode(TRANSPARENT_GIF).unwrap_or_default())
}

/// Empty but well-formed body of the bulk data file's type.
pub fn large_static(placeholder: &LargeStaticPlaceholder) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Type", placeholder.content_type.clone())
        .with_body(placeholder.body.clone())
}
