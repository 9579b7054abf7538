//! Pure pieces of the retry state machine: delay schedule and retry URLs.

use std::time::Duration;

use feedback_core::Error;
use url::Url;

/// Query parameter used to defeat intermediary caches on retries.
pub const BUST_PARAM: &str = "_bust";

/// Backoff family a failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429.
    RateLimited,
    /// HTTP 503.
    Overloaded,
    /// Timeouts, other statuses, bad bodies, transport errors.
    Other,
}

impl FailureClass {
    pub fn of(err: &Error) -> Self {
        match err {
            Error::RateLimited => FailureClass::RateLimited,
            Error::Overloaded => FailureClass::Overloaded,
            _ => FailureClass::Other,
        }
    }

    /// Delay before the first retry of this class, doubled per attempt.
    pub fn base_delay(&self) -> Duration {
        match self {
            FailureClass::RateLimited => Duration::from_millis(2000),
            FailureClass::Overloaded => Duration::from_millis(1200),
            FailureClass::Other => Duration::from_millis(600),
        }
    }

    /// Rate-limited retries reuse the same URL so a throttled endpoint is
    /// not forced to recompute.
    pub fn busts_cache(&self) -> bool {
        !matches!(self, FailureClass::RateLimited)
    }
}

/// One scheduled wait between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffAttempt {
    /// Zero-based index of the attempt that just failed.
    pub attempt_index: u32,
    pub delay: Duration,
}

impl BackoffAttempt {
    /// Delay for retrying after attempt `attempt_index` failed with `class`.
    pub fn schedule(class: FailureClass, attempt_index: u32, max_jitter: Duration) -> Self {
        Self { attempt_index, delay: backoff_delay(class, attempt_index, random_jitter(max_jitter)) }
    }
}

/// `base(class) * 2^attempt_index + jitter`, saturating on overflow.
pub fn backoff_delay(class: FailureClass, attempt_index: u32, jitter: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
    class.base_delay().saturating_mul(factor).saturating_add(jitter)
}

/// Uniform random jitter in `0..=max`.
pub fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(fastrand::u64(0..=max_ms))
}

/// URL for the attempt numbered `next_attempt`, after a failure of `class`.
///
/// Rate-limited failures keep `current` as is. Every other class sets a
/// fresh bust token derived from `nonce` and the attempt number, replacing
/// any token already present.
pub fn retry_url(current: &Url, class: FailureClass, next_attempt: u32, nonce: u64) -> Url {
    if !class.busts_cache() {
        return current.clone();
    }

    let kept: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(k, _)| k != BUST_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut next = current.clone();
    {
        let mut pairs = next.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(BUST_PARAM, &format!("{nonce:x}-{next_attempt}"));
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.example.com/exec?mode=list&plat=scs&page=1&limit=1&fast=1").unwrap()
    }

    #[test]
    fn test_classify_errors() {
        assert_eq!(FailureClass::of(&Error::RateLimited), FailureClass::RateLimited);
        assert_eq!(FailureClass::of(&Error::Overloaded), FailureClass::Overloaded);
        assert_eq!(FailureClass::of(&Error::Timeout), FailureClass::Other);
        assert_eq!(FailureClass::of(&Error::HttpError { status: 500 }), FailureClass::Other);
        assert_eq!(FailureClass::of(&Error::InvalidResponse("x".into())), FailureClass::Other);
    }

    #[test]
    fn test_backoff_schedule_without_jitter() {
        let ms = |class, i| backoff_delay(class, i, Duration::ZERO).as_millis();
        assert_eq!(ms(FailureClass::RateLimited, 0), 2000);
        assert_eq!(ms(FailureClass::RateLimited, 1), 4000);
        assert_eq!(ms(FailureClass::Overloaded, 0), 1200);
        assert_eq!(ms(FailureClass::Overloaded, 2), 4800);
        assert_eq!(ms(FailureClass::Other, 0), 600);
        assert_eq!(ms(FailureClass::Other, 3), 4800);
    }

    #[test]
    fn test_backoff_monotonic_per_class() {
        for class in [FailureClass::RateLimited, FailureClass::Overloaded, FailureClass::Other] {
            let delays: Vec<_> = (0..12).map(|i| backoff_delay(class, i, Duration::ZERO)).collect();
            assert!(delays.windows(2).all(|w| w[0] <= w[1]), "{class:?}");
        }
    }

    #[test]
    fn test_backoff_saturates() {
        let huge = backoff_delay(FailureClass::RateLimited, 64, Duration::from_millis(200));
        assert!(huge >= backoff_delay(FailureClass::RateLimited, 10, Duration::ZERO));
    }

    #[test]
    fn test_backoff_attempt_includes_bounded_jitter() {
        for _ in 0..50 {
            let attempt = BackoffAttempt::schedule(FailureClass::RateLimited, 0, Duration::from_millis(200));
            assert_eq!(attempt.attempt_index, 0);
            assert!(attempt.delay >= Duration::from_millis(2000));
            assert!(attempt.delay <= Duration::from_millis(2200));
        }
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(random_jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(random_jitter(Duration::from_millis(200)) <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_rate_limited_retry_keeps_url() {
        let url = base();
        assert_eq!(retry_url(&url, FailureClass::RateLimited, 1, 7), url);
    }

    #[test]
    fn test_other_retry_adds_bust() {
        let next = retry_url(&base(), FailureClass::Overloaded, 1, 0xab);
        let bust: Vec<_> = next.query_pairs().filter(|(k, _)| k == BUST_PARAM).collect();
        assert_eq!(bust.len(), 1);
        assert_eq!(bust[0].1, "ab-1");
        assert!(next.as_str().contains("mode=list&plat=scs"));
    }

    #[test]
    fn test_bust_is_replaced_not_duplicated() {
        let first = retry_url(&base(), FailureClass::Other, 1, 1);
        let second = retry_url(&first, FailureClass::Other, 2, 1);
        let busts: Vec<_> = second.query_pairs().filter(|(k, _)| k == BUST_PARAM).map(|(_, v)| v.into_owned()).collect();
        assert_eq!(busts, vec!["1-2".to_string()]);
    }
}
