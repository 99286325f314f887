//! Expiry evaluation for wishes.
//!
//! A wish dies by time (`expires_at` in the past) or by views
//! (`current_views` has reached `max_views`). The functions here are pure:
//! callers pass in the current time, which keeps every expiry decision
//! testable with a fixed clock.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Why a wish is no longer viewable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryCause {
    /// `expires_at` is in the past.
    Time,
    /// The view limit has been reached.
    Views,
}

impl ExpiryCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Views => "views",
        }
    }
}

impl std::fmt::Display for ExpiryCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether a wish with the given limits and counters is expired.
///
/// Time-based expiry is strict: a wish is alive at exactly `expires_at` and
/// dead one instant after. View-based expiry triggers once `current_views`
/// has reached `max_views`. When both conditions hold at once, `Time` is
/// reported; the original service checked time first and the tie-break is
/// kept for compatibility.
pub fn evaluate_expiry(
    expires_at: Option<OffsetDateTime>,
    max_views: Option<i64>,
    current_views: i64,
    now: OffsetDateTime,
) -> Option<ExpiryCause> {
    if expires_at.is_some_and(|at| now > at) {
        return Some(ExpiryCause::Time);
    }
    if max_views.is_some_and(|max| current_views >= max) {
        return Some(ExpiryCause::Views);
    }
    None
}

/// Views left before the wish expires, floored at zero.
///
/// Returns `None` when the wish has no view limit.
pub fn remaining_views(max_views: Option<i64>, current_views: i64) -> Option<i64> {
    max_views.map(|max| (max - current_views).max(0))
}
