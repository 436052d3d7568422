//! Monthly post cap for the Twitter free tier.

use chrono::{DateTime, Datelike, Utc};
use tracing::warn;

pub const MONTHLY_TWEET_LIMIT: u32 = 1500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    limit: u32,
    count: u32,
    last_post_at: Option<DateTime<Utc>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MONTHLY_TWEET_LIMIT)
    }
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            count: 0,
            last_post_at: None,
        }
    }

    /// Whether another post fits in the current month.
    pub fn check(&self, now: DateTime<Utc>) -> bool {
        match self.last_post_at {
            Some(last) if self.count >= self.limit && same_month(last, now) => {
                warn!("Monthly tweet limit reached");
                false
            }
            _ => true,
        }
    }

    pub fn record(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_post_at {
            if !same_month(last, now) {
                self.count = 0;
            }
        }
        self.count += 1;
        self.last_post_at = Some(now);
    }

    /// Posts counted towards the month of the last post.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_post_at(&self) -> Option<DateTime<Utc>> {
        self.last_post_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_limiter_allows() {
        let limiter = RateLimiter::default();
        assert!(limiter.check(at(2026, 3, 1)));
        assert_eq!(limiter.count(), 0);
        assert_eq!(limiter.last_post_at(), None);
    }

    #[test]
    fn test_blocks_at_limit_within_month() {
        let mut limiter = RateLimiter::new(3);
        for day in 1..=3 {
            assert!(limiter.check(at(2026, 3, day)));
            limiter.record(at(2026, 3, day));
        }
        assert!(!limiter.check(at(2026, 3, 20)));
    }

    #[test]
    fn test_new_month_reopens_and_resets() {
        let mut limiter = RateLimiter::new(2);
        limiter.record(at(2026, 3, 1));
        limiter.record(at(2026, 3, 2));
        assert!(!limiter.check(at(2026, 3, 31)));

        assert!(limiter.check(at(2026, 4, 1)));
        limiter.record(at(2026, 4, 1));
        assert_eq!(limiter.count(), 1);
        assert!(limiter.check(at(2026, 4, 2)));
    }

    #[test]
    fn test_same_month_different_year_is_not_same_month() {
        let mut limiter = RateLimiter::new(1);
        limiter.record(at(2025, 6, 1));
        assert!(limiter.check(at(2026, 6, 1)));
    }
}
