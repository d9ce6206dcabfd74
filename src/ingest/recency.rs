//! Exponential recency decay for collected news items.

use chrono::{DateTime, Utc};

pub const MIN_WEIGHT: f64 = 0.1;
pub const MAX_WEIGHT: f64 = 1.0;

/// Assigns each item a freshness weight in [0.1, 1.0] from its publish
/// time. Items without a parseable timestamp weigh 1.0: metadata is
/// unreliable across sources and the bias is toward inclusion.
#[derive(Debug, Clone, Copy)]
pub struct RecencyWeighter {
    window_hours: i64,
}

impl RecencyWeighter {
    pub fn new(window_hours: i64) -> Self {
        Self {
            window_hours: window_hours.max(1),
        }
    }

    /// Weight = e^(-hours_diff / (window / 3)), clamped to [0.1, 1.0].
    ///
    /// Monotonically non-increasing in `hours_diff`. Future timestamps
    /// are not special-cased; the pre-clamp weight exceeds 1.0 and the
    /// clamp brings it back to 1.0.
    pub fn weight(&self, published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(published) = published_at else {
            return MAX_WEIGHT;
        };
        let hours_diff = (now - published).num_seconds() as f64 / 3600.0;
        let decay_factor = self.window_hours as f64 / 3.0;
        (-hours_diff / decay_factor).exp().clamp(MIN_WEIGHT, MAX_WEIGHT)
    }
}
