//! Route handlers.

pub mod health;
pub mod history;
pub mod metrics;
pub mod shopping;
pub mod tasks;
pub mod timeblocks;

use axum::http::{HeaderMap, header};
use event_store::EventMetadata;

/// Builds event metadata from the request headers: user agent, forwarded
/// peer address, and the session header the UI sends.
pub(crate) fn request_metadata(headers: &HeaderMap) -> EventMetadata {
    let mut metadata = EventMetadata::new();

    if let Some(ua) = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        metadata.user_agent = ua.to_string();
    }
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
        && let Some(ip) = forwarded.split(',').next()
    {
        metadata.ip = ip.trim().to_string();
    }
    if let Some(session) = headers.get("x-session-id").and_then(|v| v.to_str().ok()) {
        metadata.session_id = session.to_string();
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_headers_with_defaults_for_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "curl/8.0".parse().unwrap());
        headers.insert("x-forwarded-for", "10.1.2.3, 172.16.0.1".parse().unwrap());

        let metadata = request_metadata(&headers);
        assert_eq!(metadata.user_agent, "curl/8.0");
        assert_eq!(metadata.ip, "10.1.2.3");
        assert_eq!(metadata.session_id, "unknown");
    }
}
