//! Best-effort client identification from proxy headers.
//!
//! Checks, in order: `x-forwarded-for` (leftmost entry), `x-real-ip`,
//! `x-vercel-forwarded-for` (leftmost entry). The first non-empty value wins.
//!
//! Clients arriving without any of these headers all map to [`UNKNOWN_CLIENT`]
//! and therefore share one rate-limit counter. This is a known fairness gap.

use axum::http::HeaderMap;

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const REAL_IP: &str = "x-real-ip";
pub const PLATFORM_FORWARDED_FOR: &str = "x-vercel-forwarded-for";

/// Identifier used when no proxy header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the client identifier. Never returns an empty string.
pub fn client_identifier(headers: &HeaderMap) -> String {
    first_in_list(headers, FORWARDED_FOR)
        .or_else(|| verbatim(headers, REAL_IP))
        .or_else(|| first_in_list(headers, PLATFORM_FORWARDED_FOR))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn first_in_list(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn verbatim(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name)
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}
