/// Minimum time between retained samples. Ticks closer together than this
/// are ignored for rate purposes so the labels don't flicker.
const MIN_SAMPLE_INTERVAL_MS: u64 = 500;

const MIB: f64 = 1024.0 * 1024.0;

/// One progress observation, annotated with the last stable rate labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSnapshot {
    /// Transfer completion in `[0, 1]`.
    pub fraction: f64,
    /// `"X.Y MB/s"` or `"X.Y KB/s"`; `None` until two samples far enough
    /// apart have been observed.
    pub speed_label: Option<String>,
    /// `"Ns"` or `"Mm Ss"`; `None` until a non-zero rate has been observed.
    pub eta_label: Option<String>,
}

/// Derives human-readable speed and ETA from `(bytes, timestamp)` ticks.
///
/// Timestamps are explicit milliseconds supplied by the caller, which keeps
/// rate computation deterministic under test. Throughput is recomputed only
/// when at least 500 ms has elapsed since the last retained sample; a
/// zero-throughput interval (stall) keeps the previous ETA rather than
/// resetting it.
#[derive(Debug, Default)]
pub struct TransferTracker {
    last_sample: Option<Sample>,
    speed_label: Option<String>,
    eta_label: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    bytes: u64,
    at_ms: u64,
}

impl TransferTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a progress tick and returns the current snapshot.
    pub fn update(&mut self, bytes_loaded: u64, bytes_total: u64, now_ms: u64) -> TransferSnapshot {
        let fraction = if bytes_total == 0 {
            0.0
        } else {
            (bytes_loaded as f64 / bytes_total as f64).min(1.0)
        };

        match self.last_sample {
            None => {
                self.last_sample = Some(Sample {
                    bytes: bytes_loaded,
                    at_ms: now_ms,
                });
            }
            Some(prev) => {
                let elapsed_ms = now_ms.saturating_sub(prev.at_ms);
                if elapsed_ms >= MIN_SAMPLE_INTERVAL_MS {
                    let delta = bytes_loaded.saturating_sub(prev.bytes);
                    let bytes_per_second = delta as f64 * 1000.0 / elapsed_ms as f64;
                    self.speed_label = Some(format_speed(bytes_per_second));
                    if bytes_per_second > 0.0 {
                        let remaining = bytes_total.saturating_sub(bytes_loaded);
                        let eta_seconds = (remaining as f64 / bytes_per_second).ceil() as u64;
                        self.eta_label = Some(format_eta(eta_seconds));
                    }
                    self.last_sample = Some(Sample {
                        bytes: bytes_loaded,
                        at_ms: now_ms,
                    });
                }
            }
        }

        TransferSnapshot {
            fraction,
            speed_label: self.speed_label.clone(),
            eta_label: self.eta_label.clone(),
        }
    }

    /// Clears all samples and labels, ready for a fresh transfer.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Formats bytes/second as `"X.Y MB/s"` (≥ 1 MiB/s) or `"X.Y KB/s"`.
fn format_speed(bytes_per_second: f64) -> String {
    if bytes_per_second >= MIB {
        format!("{:.1} MB/s", bytes_per_second / MIB)
    } else {
        format!("{:.1} KB/s", bytes_per_second / 1024.0)
    }
}

/// Formats remaining seconds as `"Ns"` (< 60 s) or `"Mm Ss"`.
fn format_eta(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{}m {}s", seconds / 60, seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_no_labels() {
        let mut tracker = TransferTracker::new();
        let snap = tracker.update(0, 1000, 0);
        assert_eq!(snap.fraction, 0.0);
        assert!(snap.speed_label.is_none());
        assert!(snap.eta_label.is_none());
    }

    #[test]
    fn speed_in_kb_per_second() {
        let mut tracker = TransferTracker::new();
        tracker.update(0, 1_000_000, 0);
        // 51200 bytes over 1000 ms = 50.0 KB/s.
        let snap = tracker.update(51_200, 1_000_000, 1000);
        assert_eq!(snap.speed_label.as_deref(), Some("50.0 KB/s"));
    }

    #[test]
    fn speed_in_mb_per_second() {
        let mut tracker = TransferTracker::new();
        tracker.update(0, 100 * 1024 * 1024, 0);
        // 2 MiB over 1000 ms = 2.0 MB/s.
        let snap = tracker.update(2 * 1024 * 1024, 100 * 1024 * 1024, 1000);
        assert_eq!(snap.speed_label.as_deref(), Some("2.0 MB/s"));
    }

    #[test]
    fn eta_under_a_minute() {
        let mut tracker = TransferTracker::new();
        tracker.update(0, 100_000, 0);
        // 10000 bytes/s, 90000 remaining => 9s.
        let snap = tracker.update(10_000, 100_000, 1000);
        assert_eq!(snap.eta_label.as_deref(), Some("9s"));
    }

    #[test]
    fn eta_minutes_and_seconds() {
        let mut tracker = TransferTracker::new();
        tracker.update(0, 1_300_000, 0);
        // 10000 bytes/s, 1290000 remaining => 129s => 2m 9s.
        let snap = tracker.update(10_000, 1_300_000, 1000);
        assert_eq!(snap.eta_label.as_deref(), Some("2m 9s"));
    }

    #[test]
    fn ticks_closer_than_500ms_keep_previous_labels() {
        let mut tracker = TransferTracker::new();
        tracker.update(0, 1_000_000, 0);
        let first = tracker.update(51_200, 1_000_000, 1000);

        // Rapid ticks: labels must not change, whatever the implied rate.
        let s1 = tracker.update(52_000, 1_000_000, 1100);
        let s2 = tracker.update(900_000, 1_000_000, 1400);
        assert_eq!(s1.speed_label, first.speed_label);
        assert_eq!(s1.eta_label, first.eta_label);
        assert_eq!(s2.speed_label, first.speed_label);
        assert_eq!(s2.eta_label, first.eta_label);

        // Fraction still advances on every tick.
        assert!(s2.fraction > s1.fraction);
    }

    #[test]
    fn stall_retains_previous_eta() {
        let mut tracker = TransferTracker::new();
        tracker.update(0, 100_000, 0);
        let before = tracker.update(10_000, 100_000, 1000);
        assert!(before.eta_label.is_some());

        // No bytes moved for a full second: speed drops to 0, ETA retained.
        let stalled = tracker.update(10_000, 100_000, 2000);
        assert_eq!(stalled.speed_label.as_deref(), Some("0.0 KB/s"));
        assert_eq!(stalled.eta_label, before.eta_label);
    }

    #[test]
    fn fraction_clamped_to_one() {
        let mut tracker = TransferTracker::new();
        let snap = tracker.update(2000, 1000, 0);
        assert_eq!(snap.fraction, 1.0);
    }

    #[test]
    fn zero_total_yields_zero_fraction() {
        let mut tracker = TransferTracker::new();
        let snap = tracker.update(0, 0, 0);
        assert_eq!(snap.fraction, 0.0);
    }

    #[test]
    fn reset_clears_labels() {
        let mut tracker = TransferTracker::new();
        tracker.update(0, 100_000, 0);
        tracker.update(10_000, 100_000, 1000);
        tracker.reset();
        let snap = tracker.update(0, 100_000, 2000);
        assert!(snap.speed_label.is_none());
        assert!(snap.eta_label.is_none());
    }
}
