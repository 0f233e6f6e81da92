//! AudioLevelObserver: periodic top-N loudest-producer notification.
//! Accumulates SSRC audio-level extension readings (`rtp_ext`) per
//! producer and emits a `volumes` or `silence` event every `interval` ms.

use std::collections::HashMap;

use crate::utils::Id;

#[derive(Debug, Clone)]
pub struct Volume {
    pub producer_id: Id,
    pub dbov: f64,
}

#[derive(Debug, Clone)]
pub enum AudioLevelEvent {
    Volumes(Vec<Volume>),
    Silence,
}

struct Accumulator {
    sum_dbov: f64,
    samples: u32,
}

pub struct AudioLevelObserver {
    pub interval_ms: u64,
    pub threshold_dbov: f64,
    pub max_entries: usize,
    accumulators: HashMap<Id, Accumulator>,
    last_tick_ms: u64,
    paused: bool,
}

impl AudioLevelObserver {
    pub fn new(interval_ms: u64, threshold_dbov: f64, max_entries: usize) -> Self {
        Self {
            interval_ms,
            threshold_dbov,
            max_entries,
            accumulators: HashMap::new(),
            last_tick_ms: 0,
            paused: false,
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.accumulators.clear();
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Feeds one audio-level sample (0 = loudest, 127 = silence per RFC
    /// 6464) observed on `producer_id`.
    pub fn add_sample(&mut self, producer_id: &str, level_dbov: u8) {
        if self.paused {
            return;
        }
        let dbov = -(level_dbov as f64);
        let acc = self.accumulators.entry(producer_id.to_string()).or_insert(Accumulator { sum_dbov: 0.0, samples: 0 });
        acc.sum_dbov += dbov;
        acc.samples += 1;
    }

    /// Called once per `interval_ms`; returns the event to emit and resets
    /// accumulators for the next window.
    pub fn tick(&mut self, now_ms: u64) -> Option<AudioLevelEvent> {
        if self.paused || now_ms.saturating_sub(self.last_tick_ms) < self.interval_ms {
            return None;
        }
        self.last_tick_ms = now_ms;
        let mut volumes: Vec<Volume> = self
            .accumulators
            .drain()
            .filter_map(|(producer_id, acc)| {
                if acc.samples == 0 {
                    return None;
                }
                let avg = acc.sum_dbov / acc.samples as f64;
                (avg >= self.threshold_dbov).then_some(Volume { producer_id, dbov: avg })
            })
            .collect();
        volumes.sort_by(|a, b| b.dbov.partial_cmp(&a.dbov).unwrap());
        volumes.truncate(self.max_entries);
        Some(if volumes.is_empty() { AudioLevelEvent::Silence } else { AudioLevelEvent::Volumes(volumes) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_producers_are_filtered_out() {
        let mut obs = AudioLevelObserver::new(1_000, -50.0, 3);
        obs.add_sample("p1", 80); // -80 dBov, below -50 threshold
        obs.add_sample("p2", 10); // -10 dBov, above threshold
        match obs.tick(1_000).unwrap() {
            AudioLevelEvent::Volumes(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].producer_id, "p2");
            }
            AudioLevelEvent::Silence => panic!("expected volumes"),
        }
    }

    #[test]
    fn no_samples_emits_silence() {
        let mut obs = AudioLevelObserver::new(1_000, -50.0, 3);
        assert!(matches!(obs.tick(1_000), Some(AudioLevelEvent::Silence)));
    }

    #[test]
    fn pause_clears_accumulators() {
        let mut obs = AudioLevelObserver::new(1_000, -50.0, 3);
        obs.add_sample("p1", 10);
        obs.pause();
        assert!(obs.accumulators.is_empty());
    }
}
