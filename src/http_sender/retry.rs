//! Response classification and backoff delays for delivery retries.

use std::time::Duration;

use rand::{Rng, thread_rng};
use rand_distr::StandardNormal;
use regex::Regex;

/// Default pattern for retryable status codes: any 5xx.
pub const DEFAULT_RETRYABLE_STATUS_PATTERN: &str = "^5.*";

/// Backoff never exceeds this multiple of the base retry interval.
pub const MAX_BACKOFF_FACTOR: f64 = 100.0;

/// Classification of HTTP response for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx responses - request succeeded.
    Success,
    /// Matches the retryable pattern, or 503 - retry with backoff.
    Retryable,
    /// Anything else - log and give up on this payload.
    Permanent,
}

/// Decides which statuses are worth retrying.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    retryable: Regex,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retryable: Regex::new(DEFAULT_RETRYABLE_STATUS_PATTERN)
                .expect("default retryable status pattern must compile"),
        }
    }
}

impl RetryPolicy {
    /// Build a policy retrying statuses whose decimal form matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn from_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            retryable: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.retryable.as_str()
    }

    /// Classify `status` for the retry loop.
    ///
    /// * **2xx** → [`ResponseClass::Success`]
    /// * **503** or a pattern match → [`ResponseClass::Retryable`]
    /// * **Other** → [`ResponseClass::Permanent`]
    pub fn classify(&self, status: u16) -> ResponseClass {
        match status {
            200..=299 => ResponseClass::Success,
            503 => ResponseClass::Retryable,
            _ if self.retryable.is_match(&status.to_string()) => ResponseClass::Retryable,
            _ => ResponseClass::Permanent,
        }
    }
}

/// Un-jittered delay before retry number `n_try`.
///
/// `retry_interval * 2^(n_try - 1)`, capped at `retry_interval * 100`.
pub fn nominal_backoff(retry_interval: Duration, n_try: u32) -> Duration {
    let base_ms = retry_interval.as_secs_f64() * 1_000.0;
    let exponent = i32::try_from(n_try).unwrap_or(i32::MAX).saturating_sub(1);
    let delay_ms = (base_ms * 2f64.powi(exponent)).min(base_ms * MAX_BACKOFF_FACTOR);
    millis_to_duration(delay_ms)
}

/// Perturb `delay` with Gaussian noise whose deviation is a quarter of it.
///
/// The result is floored at zero.
pub fn jitter<R: Rng>(delay: Duration, rng: &mut R) -> Duration {
    let delay_ms = delay.as_secs_f64() * 1_000.0;
    let noise: f64 = rng.sample(StandardNormal);
    millis_to_duration((delay_ms + noise * delay_ms / 4.0).max(0.0))
}

/// Jittered exponential backoff before retry number `n_try`.
pub fn exponential_backoff(retry_interval: Duration, n_try: u32) -> Duration {
    jitter(nominal_backoff(retry_interval, n_try), &mut thread_rng())
}

fn millis_to_duration(ms: f64) -> Duration {
    if ms <= 0.0 || ms.is_nan() {
        return Duration::ZERO;
    }
    // Whole milliseconds, like the sleep granularity we actually get.
    Duration::try_from_secs_f64(ms.trunc() / 1_000.0).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::rstest;

    const BASE: Duration = Duration::from_millis(100);

    #[rstest]
    #[case(200, ResponseClass::Success)]
    #[case(204, ResponseClass::Success)]
    #[case(400, ResponseClass::Permanent)]
    #[case(404, ResponseClass::Permanent)]
    #[case(429, ResponseClass::Permanent)]
    #[case(500, ResponseClass::Retryable)]
    #[case(502, ResponseClass::Retryable)]
    #[case(503, ResponseClass::Retryable)]
    fn default_policy_classification(#[case] status: u16, #[case] expected: ResponseClass) {
        assert_eq!(RetryPolicy::default().classify(status), expected);
    }

    #[rstest]
    fn custom_pattern_widens_and_narrows() {
        let policy = RetryPolicy::from_pattern("^(429|502)$").expect("valid pattern");
        assert_eq!(policy.classify(429), ResponseClass::Retryable);
        assert_eq!(policy.classify(502), ResponseClass::Retryable);
        assert_eq!(policy.classify(500), ResponseClass::Permanent);
        // 503 is always retried.
        assert_eq!(policy.classify(503), ResponseClass::Retryable);
        assert_eq!(policy.pattern(), "^(429|502)$");
    }

    #[rstest]
    fn invalid_pattern_is_rejected() {
        assert!(RetryPolicy::from_pattern("(5").is_err());
    }

    #[rstest]
    #[case(0, 50)]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(4, 800)]
    #[case(7, 6_400)]
    #[case(8, 10_000)]
    #[case(1_000, 10_000)]
    #[case(u32::MAX, 10_000)]
    fn nominal_backoff_doubles_up_to_cap(#[case] n_try: u32, #[case] expected_ms: u64) {
        assert_eq!(
            nominal_backoff(BASE, n_try),
            Duration::from_millis(expected_ms)
        );
    }

    #[rstest]
    fn nominal_backoff_is_non_decreasing() {
        let mut previous = Duration::ZERO;
        for n_try in 0..64 {
            let delay = nominal_backoff(BASE, n_try);
            assert!(delay >= previous, "n_try {n_try} went backwards");
            previous = delay;
        }
    }

    #[rstest]
    fn jitter_centres_on_the_nominal_delay() {
        let mut rng = StdRng::seed_from_u64(7);
        let nominal = Duration::from_secs(1);
        let samples: Vec<Duration> = (0..2_000).map(|_| jitter(nominal, &mut rng)).collect();

        let mean_ms = samples.iter().map(Duration::as_millis).sum::<u128>() / 2_000;
        assert!((950..=1_050).contains(&mean_ms), "mean {mean_ms}ms");
        assert!(samples.iter().any(|d| *d < nominal));
        assert!(samples.iter().any(|d| *d > nominal));
        assert!(samples.iter().all(|d| *d <= nominal * 3));
    }

    #[rstest]
    fn exponential_backoff_tracks_the_nominal_schedule() {
        for n_try in [1, 4, 8, 50] {
            let nominal = nominal_backoff(BASE, n_try);
            let delay = exponential_backoff(BASE, n_try);
            assert!(delay <= nominal * 3, "n_try {n_try}: {delay:?} vs {nominal:?}");
        }
        let capped = nominal_backoff(BASE, 1_000);
        let mean_ms = (0..500)
            .map(|_| exponential_backoff(BASE, 1_000).as_millis())
            .sum::<u128>()
            / 500;
        assert!(
            mean_ms.abs_diff(capped.as_millis()) < capped.as_millis() / 10,
            "mean {mean_ms}ms"
        );
    }

    #[rstest]
    fn jitter_of_zero_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(jitter(Duration::ZERO, &mut rng), Duration::ZERO);
    }
}
