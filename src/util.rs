//! Shared utility functions for the Crewdeck application.

use axum::http::HeaderMap;

/// Client context captured for audit logging.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestInfo {
    /// Extract client IP address and user-agent from request headers.
    ///
    /// Tries `x-forwarded-for` first (for proxied requests), then
    /// `x-real-ip`, and reads the `user-agent` header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = headers
            .get("x-forwarded-for")
            .or_else(|| headers.get("x-real-ip"))
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self {
            ip_address,
            user_agent,
        }
    }
}

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Lowercase-normalize an email for storage and comparison. Membership
/// uniqueness is case-insensitive on the invited email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
