//! # Reconnect Backoff
//!
//! Fibonacci-based delay between watch reconnect attempts. Grows more slowly
//! than exponential backoff, so a flapping API server is retried promptly
//! without being hammered.
//!
//! Sequence with the defaults: 1s, 1s, 2s, 3s, 5s, 8s, 13s, 21s, 30s (max).
//! There is no attempt limit; the sequence stays at the cap forever.

use std::time::Duration;

/// Default first delay in seconds.
pub const DEFAULT_MIN_SECONDS: u64 = 1;

/// Default delay cap in seconds.
pub const DEFAULT_MAX_SECONDS: u64 = 30;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_seconds: u64,
    /// Previous backoff value in seconds
    prev_seconds: u64,
    /// Current backoff value in seconds
    current_seconds: u64,
    /// Maximum backoff value in seconds
    max_seconds: u64,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SECONDS, DEFAULT_MAX_SECONDS)
    }
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values in seconds
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;

        let next_seconds = self.prev_seconds.saturating_add(self.current_seconds);
        self.prev_seconds = self.current_seconds;
        self.current_seconds = next_seconds.min(self.max_seconds);

        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut FibonacciBackoff) -> u64 {
        backoff.next_backoff().as_secs()
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::default();

        let seq: Vec<u64> = (0..9).map(|_| secs(&mut backoff)).collect();
        assert_eq!(seq, vec![1, 1, 2, 3, 5, 8, 13, 21, 30]);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(1, 5);

        for _ in 0..5 {
            secs(&mut backoff);
        }
        // Next would be 8s (3+5), capped at 5s
        assert_eq!(secs(&mut backoff), 5);
        assert_eq!(secs(&mut backoff), 5);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::default();

        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 2);
        assert_eq!(secs(&mut backoff), 3);

        backoff.reset();

        // Should restart from beginning after a healthy connection
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 2);
    }
}
