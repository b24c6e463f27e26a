//! Proactive refresh timing

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Time to wait before refreshing a session that expires at `expires_at`.
///
/// Zero when the session is already inside the margin or expired.
pub fn refresh_delay(expires_at: DateTime<Utc>, now: DateTime<Utc>, margin: Duration) -> Duration {
    let remaining = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
    remaining.saturating_sub(margin)
}
