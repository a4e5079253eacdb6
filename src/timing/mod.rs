//! Session timing and statistics
//!
//! Monotonic clock anchored at session construction, used for start
//! latency and stop duration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Monotonic timer started when a session is constructed.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimer {
    constructed: Instant,
}

impl SessionTimer {
    pub fn start() -> Self {
        Self {
            constructed: Instant::now(),
        }
    }

    /// Time since construction.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.constructed.elapsed()
    }

    pub fn constructed_at(&self) -> Instant {
        self.constructed
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::start()
    }
}

pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Counters and latency samples for one capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub created_at: DateTime<Utc>,
    /// Construction to first accepted frame.
    pub start_latency_ms: Option<u64>,
    pub stop_duration_ms: Option<u64>,
    pub frames_delivered: u64,
    /// Frames that arrived after the session left `Running`.
    pub frames_dropped: u64,
    pub capture_failures: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            start_latency_ms: None,
            stop_duration_ms: None,
            frames_delivered: 0,
            frames_dropped: 0,
            capture_failures: 0,
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_is_monotonic() {
        let timer = SessionTimer::start();
        let first = timer.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed() > first);
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_micros(2500)), 2);
        assert_eq!(duration_ms(Duration::from_secs(3)), 3000);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = SessionStats::new();
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("start_latency_ms"));
        assert!(json.contains("frames_delivered"));
    }
}
