use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::stats::Stats;

/// Bounded history of frame arrival timestamps (spec.md §4.5: "last 1,000").
const RING_CAPACITY: usize = 1_000;

/// C5: counts frames, dropped frames, and elapsed wall time, computing
/// instantaneous FPS on demand.
///
/// spec.md §4.5 describes this as "a process-wide singleton (one instance
/// per session is equivalent and preferred in a rewrite)" — this
/// implementation is the per-session instance, using an atomics-plus-ring
/// shape for the last-1,000 frame-arrival history. [`global`] preserves the
/// singleton call shape at the API surface without a language-specific lazy
/// initializer (spec.md §9 Design Notes).
pub struct PerformanceMonitor {
    start: Mutex<Option<Instant>>,
    total_frames: AtomicU64,
    dropped_frames: AtomicU64,
    arrivals: Mutex<VecDeque<Instant>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        PerformanceMonitor {
            start: Mutex::new(None),
            total_frames: AtomicU64::new(0),
            dropped_frames: AtomicU64::new(0),
            arrivals: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
        }
    }

    /// Records a monotonic base time and zeroes counters (spec.md §4.5).
    /// Called on `play()` and on every reconnect, matching the timestamp
    /// rebasing spec.md §3 requires elsewhere in the session.
    pub fn start(&self) {
        *self.start.lock().unwrap() = Some(Instant::now());
        self.total_frames.store(0, Ordering::Relaxed);
        self.dropped_frames.store(0, Ordering::Relaxed);
        self.arrivals.lock().unwrap().clear();
    }

    /// Increments `total_frames` and records the arrival in the bounded ring.
    /// Invoked on the decode hot path — the critical section is the ring
    /// push alone (spec.md §4.5: "lock-free or a short critical section").
    pub fn record_frame(&self) {
        self.total_frames.fetch_add(1, Ordering::Relaxed);
        let mut arrivals = self.arrivals.lock().unwrap();
        if arrivals.len() == RING_CAPACITY {
            arrivals.pop_front();
        }
        arrivals.push_back(Instant::now());
    }

    pub fn record_dropped_frame(&self) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// `{ fps = total_frames / elapsed, total_frames, duration_s, dropped_frames }`
    /// (spec.md §4.5).
    pub fn current_stats(&self) -> Stats {
        let elapsed = self
            .start
            .lock()
            .unwrap()
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let total_frames = self.total_frames.load(Ordering::Relaxed);
        let fps = if elapsed > 0.0 {
            total_frames as f64 / elapsed
        } else {
            0.0
        };

        Stats {
            fps,
            total_frames,
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            duration_s: elapsed,
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<PerformanceMonitor> = OnceLock::new();

/// Process-wide accessor preserving the singleton shape of spec.md §4.5's
/// source at the API surface, backed by a `OnceLock` rather than a
/// language-specific lazy static (spec.md §9 Design Notes).
pub fn global() -> &'static PerformanceMonitor {
    GLOBAL.get_or_init(PerformanceMonitor::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fps_is_zero_before_start() {
        let monitor = PerformanceMonitor::new();
        let stats = monitor.current_stats();
        assert_eq!(stats.fps, 0.0);
        assert_eq!(stats.total_frames, 0);
    }

    #[test]
    fn records_frames_and_drops() {
        let monitor = PerformanceMonitor::new();
        monitor.start();
        for _ in 0..10 {
            monitor.record_frame();
        }
        monitor.record_dropped_frame();
        monitor.record_dropped_frame();

        let stats = monitor.current_stats();
        assert_eq!(stats.total_frames, 10);
        assert_eq!(stats.dropped_frames, 2);
        assert!(stats.duration_s >= 0.0);
    }

    #[test]
    fn ring_is_bounded() {
        let monitor = PerformanceMonitor::new();
        monitor.start();
        for _ in 0..(RING_CAPACITY + 50) {
            monitor.record_frame();
        }
        assert_eq!(monitor.arrivals.lock().unwrap().len(), RING_CAPACITY);
        assert_eq!(monitor.total_frames.load(Ordering::Relaxed), (RING_CAPACITY + 50) as u64);
    }

    #[test]
    fn restart_resets_counters() {
        let monitor = PerformanceMonitor::new();
        monitor.start();
        monitor.record_frame();
        monitor.record_dropped_frame();
        thread::sleep(Duration::from_millis(5));

        monitor.start();
        let stats = monitor.current_stats();
        assert_eq!(stats.total_frames, 0);
        assert_eq!(stats.dropped_frames, 0);
    }
}
