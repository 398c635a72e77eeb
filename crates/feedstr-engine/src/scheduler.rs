// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-feed polling cadence.

use feedstr_core::{FeedEntity, Timestamp};

/// Bounds for the learned polling interval, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Fewer item timestamps than this fall back to `max_secs`.
    pub min_samples: usize,
    pub min_secs: i64,
    pub max_secs: i64,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            min_samples: 5,
            min_secs: 15 * 60,
            max_secs: 12 * 3600,
        }
    }
}

impl Cadence {
    /// Average spacing of `timestamps`, clamped into `[min_secs, max_secs]`.
    pub fn recompute_cadence(&self, timestamps: &[Timestamp]) -> i64 {
        if timestamps.is_empty() || timestamps.len() < self.min_samples {
            return self.max_secs;
        }
        let mut sorted = timestamps.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        let newest = sorted[0];
        let oldest = sorted[sorted.len() - 1];
        let count = i64::try_from(sorted.len()).unwrap_or(i64::MAX);
        let average = newest.saturating_sub(oldest) / count;
        average.clamp(self.min_secs, self.max_secs.max(self.min_secs))
    }
}

/// Whether `entity` should be fetched at `now`.
pub fn is_due(entity: &FeedEntity, now: Timestamp) -> bool {
    now.saturating_sub(entity.last_checked_time) >= entity.avg_post_interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entity(last_checked_time: Timestamp, avg_post_interval: i64) -> FeedEntity {
        FeedEntity {
            pubkey: "ab".repeat(32),
            private_key: "cd".repeat(32),
            url: "https://example.com/feed.xml".into(),
            image_url: None,
            last_post_time: 0,
            last_checked_time,
            avg_post_interval,
        }
    }

    #[test]
    fn too_few_samples_use_the_ceiling() {
        let cadence = Cadence::default();
        assert_eq!(cadence.recompute_cadence(&[]), cadence.max_secs);
        assert_eq!(cadence.recompute_cadence(&[1, 2, 3, 4]), cadence.max_secs);
    }

    #[test]
    fn average_spacing_is_divided_by_count() {
        let cadence = Cadence {
            min_samples: 2,
            min_secs: 1,
            max_secs: 1_000_000,
        };
        // Span 4000 over 4 samples.
        assert_eq!(cadence.recompute_cadence(&[4000, 0, 1000, 3000]), 1000);
    }

    #[test]
    fn frequent_feeds_hit_the_floor() {
        let cadence = Cadence::default();
        let times: Vec<Timestamp> = (0..10).map(|i| i * 10).collect();
        assert_eq!(cadence.recompute_cadence(&times), cadence.min_secs);
    }

    #[test]
    fn due_once_the_interval_elapsed() {
        assert!(is_due(&entity(100, 50), 150));
        assert!(!is_due(&entity(100, 50), 149));
        assert!(is_due(&entity(0, 0), 0));
    }

    proptest! {
        #[test]
        fn cadence_stays_within_bounds(times in proptest::collection::vec(0i64..2_000_000_000, 0..40)) {
            let cadence = Cadence::default();
            let secs = cadence.recompute_cadence(&times);
            prop_assert!(secs >= cadence.min_secs);
            prop_assert!(secs <= cadence.max_secs);
            if times.len() < cadence.min_samples {
                prop_assert_eq!(secs, cadence.max_secs);
            }
        }
    }
}
