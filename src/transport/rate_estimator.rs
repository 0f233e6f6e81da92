//! Windowed byte-rate estimator backing the Transport's "sliding-window
//! rate estimator"  and RtpStream's "max bitrate tracker (windowed
//! byte counter)" . Bucketed per millisecond-span,
//! mirroring the counter mediasoup's `RTC::RtpStream` keeps per encoding.

const BUCKET_COUNT: usize = 100;

struct Bucket {
    start_ms: u64,
    bytes: u64,
}

pub struct RateEstimator {
    window_ms: u64,
    bucket_span_ms: u64,
    buckets: Vec<Bucket>,
}

impl RateEstimator {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            bucket_span_ms: (window_ms / BUCKET_COUNT as u64).max(1),
            buckets: Vec::new(),
        }
    }

    pub fn add(&mut self, bytes: u64, now_ms: u64) {
        self.evict(now_ms);
        let bucket_start = now_ms - (now_ms % self.bucket_span_ms);
        if let Some(last) = self.buckets.last_mut() {
            if last.start_ms == bucket_start {
                last.bytes += bytes;
                return;
            }
        }
        self.buckets.push(Bucket {
            start_ms: bucket_start,
            bytes,
        });
    }

    fn evict(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        self.buckets.retain(|b| b.start_ms >= cutoff);
    }

    /// Bits per second averaged over the trailing window.
    pub fn rate_bps(&mut self, now_ms: u64) -> u64 {
        self.evict(now_ms);
        let total: u64 = self.buckets.iter().map(|b| b.bytes).sum();
        if self.window_ms == 0 {
            return 0;
        }
        total * 8 * 1000 / self.window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_decays_once_bytes_fall_out_of_window() {
        let mut rate = RateEstimator::new(1_000);
        rate.add(1_000, 0); // 1000 bytes -> 8000 bits over 1s window => 8000 bps
        assert_eq!(rate.rate_bps(0), 8_000);
        assert_eq!(rate.rate_bps(2_000), 0);
    }
}
