//! Decode timing statistics
//!
//! Keeps a rolling window of decode+convert durations and emission times for
//! the playback controller.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default window: 5 seconds of 60fps video
const DEFAULT_MAX_SAMPLES: usize = 300;

/// Frame timing statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Average decode+convert time in milliseconds
    pub avg_ms: f64,
    /// Minimum time in milliseconds
    pub min_ms: f64,
    /// Maximum time in milliseconds
    pub max_ms: f64,
    /// 50th percentile (median)
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// 99th percentile
    pub p99_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Rolling profiler for per-frame decode cost
#[derive(Debug, Clone)]
pub struct DecodeProfiler {
    decode_times: VecDeque<Duration>,
    emissions: VecDeque<Instant>,
    max_samples: usize,
}

impl Default for DecodeProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeProfiler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SAMPLES)
    }

    /// Create a profiler keeping at most `max_samples` samples
    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            decode_times: VecDeque::with_capacity(max_samples),
            emissions: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record one emitted frame that took `decode_time` to produce
    pub fn record(&mut self, decode_time: Duration) {
        self.record_at(decode_time, Instant::now());
    }

    pub(crate) fn record_at(&mut self, decode_time: Duration, emitted_at: Instant) {
        self.decode_times.push_back(decode_time);
        if self.decode_times.len() > self.max_samples {
            self.decode_times.pop_front();
        }
        self.emissions.push_back(emitted_at);
        if self.emissions.len() > self.max_samples {
            self.emissions.pop_front();
        }
    }

    /// Drop all samples (new session)
    pub fn clear(&mut self) {
        self.decode_times.clear();
        self.emissions.clear();
    }

    /// Get decode timing statistics
    pub fn stats(&self) -> FrameStats {
        if self.decode_times.is_empty() {
            return FrameStats::default();
        }

        let mut times: Vec<f64> = self
            .decode_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sum: f64 = times.iter().sum();
        let count = times.len() as f64;

        FrameStats {
            avg_ms: sum / count,
            min_ms: times.first().copied().unwrap_or(0.0),
            max_ms: times.last().copied().unwrap_or(0.0),
            p50_ms: percentile(&times, 0.50),
            p95_ms: percentile(&times, 0.95),
            p99_ms: percentile(&times, 0.99),
            sample_count: times.len(),
        }
    }

    /// Effective emission rate over the window
    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.emissions.front(), self.emissions.back()) else {
            return 0.0;
        };
        if self.emissions.len() < 2 {
            return 0.0;
        }

        let duration = last.duration_since(*first).as_secs_f64();
        if duration > 0.0 {
            (self.emissions.len() - 1) as f64 / duration
        } else {
            0.0
        }
    }

    /// Last decode time in milliseconds
    pub fn last_decode_ms(&self) -> f64 {
        self.decode_times
            .back()
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Calculate percentile from sorted array
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let profiler = DecodeProfiler::new();
        assert_eq!(profiler.stats(), FrameStats::default());
        assert_eq!(profiler.fps(), 0.0);
    }

    #[test]
    fn test_stats_over_samples() {
        let mut profiler = DecodeProfiler::new();
        let start = Instant::now();
        for i in 1..=4u64 {
            profiler.record_at(Duration::from_millis(i), start + Duration::from_millis(100 * i));
        }

        let stats = profiler.stats();
        assert_eq!(stats.sample_count, 4);
        assert!((stats.avg_ms - 2.5).abs() < 1e-9);
        assert!((stats.min_ms - 1.0).abs() < 1e-9);
        assert!((stats.max_ms - 4.0).abs() < 1e-9);
        assert!((profiler.fps() - 10.0).abs() < 1e-6);
        assert!((profiler.last_decode_ms() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut profiler = DecodeProfiler::with_capacity(3);
        for i in 0..10 {
            profiler.record(Duration::from_millis(i));
        }
        assert_eq!(profiler.stats().sample_count, 3);

        profiler.clear();
        assert_eq!(profiler.stats().sample_count, 0);
    }
}
