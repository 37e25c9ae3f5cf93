//! Error sanitization and timing defense for enumeration-sensitive paths.
//!
//! Certain invitation failures (inviting the project owner, inviting
//! yourself, inviting an existing member) would reveal who belongs to a
//! project if they produced distinct responses. Every such branch collapses
//! into one of the fixed failures below, and the response is delayed by a
//! bounded uniform random amount so latency carries no signal either. The
//! true reason is logged server-side before sanitization.

use std::time::Duration;

use axum::http::StatusCode;
use rand::Rng;

/// The closed set of sanitized failures. Each kind maps to exactly one
/// status code and one pre-written message with no entity names, role
/// names, or existence information in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureFailure {
    /// Any enumeration-sensitive invitation failure.
    InvitationFailed,
    /// Any fine-grained authorization failure (e.g. why an admin cannot
    /// touch another admin).
    Unauthorized,
}

impl SecureFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            SecureFailure::InvitationFailed => StatusCode::BAD_REQUEST,
            SecureFailure::Unauthorized => StatusCode::FORBIDDEN,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SecureFailure::InvitationFailed => "Unable to process invitation",
            SecureFailure::Unauthorized => "You do not have permission to perform this action",
        }
    }
}

/// Sleep a uniformly random duration in `min_ms..=max_ms`.
///
/// Applied only on the enumeration-sensitive invite branches; ordinary
/// validation and not-found errors must not pay this cost. A zero `max_ms`
/// disables the delay entirely (used by tests).
pub async fn timing_noise(min_ms: u64, max_ms: u64) {
    if max_ms == 0 || max_ms < min_ms {
        return;
    }
    let delay = rand::thread_rng().gen_range(min_ms..=max_ms);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}
