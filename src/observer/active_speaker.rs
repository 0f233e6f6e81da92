//! ActiveSpeakerObserver: dominant-speaker detection per the
//! Volfin-Cohen algorithm , comparing each producer's
//! short/medium/long activity windows against the current dominant
//! speaker's via a log-likelihood ratio, with medium-window score as the
//! tie-break. Idle producers are soft-paused after 15 s of silence.

use std::collections::HashMap;

const IMMEDIATE_WINDOW_MS: u64 = 150;
const MEDIUM_WINDOW_MS: u64 = 500;
const LONG_WINDOW_MS: u64 = 2_500;
const IDLE_TIMEOUT_MS: u64 = 15_000;
/// Minimum immediate-window level for a speaker to challenge the current
/// dominant speaker at all.
const ACTIVITY_THRESHOLD: f64 = 0.1;

/// Exponentially-weighted activity level over one window.
#[derive(Debug, Clone, Copy, Default)]
struct Window {
    level: f64,
    window_ms: u64,
}

impl Window {
    fn update(&mut self, active: bool, elapsed_ms: u64) {
        if self.window_ms == 0 {
            return;
        }
        let alpha = 1.0 - (-(elapsed_ms as f64) / self.window_ms as f64).exp();
        let sample = if active { 1.0 } else { 0.0 };
        self.level += alpha * (sample - self.level);
    }
}

struct Speaker {
    immediate: Window,
    medium: Window,
    long: Window,
    last_active_ms: u64,
    soft_paused: bool,
}

impl Speaker {
    fn new() -> Self {
        Self {
            immediate: Window { level: 0.0, window_ms: IMMEDIATE_WINDOW_MS },
            medium: Window { level: 0.0, window_ms: MEDIUM_WINDOW_MS },
            long: Window { level: 0.0, window_ms: LONG_WINDOW_MS },
            last_active_ms: 0,
            soft_paused: false,
        }
    }

    /// Log-likelihood ratio of this speaker's immediate activity against
    /// `other`'s, using the long-window level as the Bernoulli prior.
    fn llr_against(&self, other: &Speaker) -> f64 {
        let p_self = self.long.level.clamp(1e-3, 1.0 - 1e-3);
        let p_other = other.long.level.clamp(1e-3, 1.0 - 1e-3);
        let c1 = self.immediate.level * (p_self / p_other).ln();
        let c2 = (1.0 - self.immediate.level) * ((1.0 - p_self) / (1.0 - p_other)).ln();
        c1 + c2
    }
}

pub struct ActiveSpeakerObserver {
    speakers: HashMap<String, Speaker>,
    last_update_ms: u64,
    pub dominant: Option<String>,
}

impl ActiveSpeakerObserver {
    pub fn new() -> Self {
        Self { speakers: HashMap::new(), last_update_ms: 0, dominant: None }
    }

    /// Feeds a voice-activity bit (from the audio-level extension's
    /// voice-activity flag, or a threshold crossing) for `producer_id` at
    /// `now_ms`. Returns `Some(producer_id)` if the dominant speaker
    /// changed as a result.
    pub fn add_activity(&mut self, producer_id: &str, active: bool, now_ms: u64) -> Option<String> {
        let elapsed = now_ms.saturating_sub(self.last_update_ms).max(1);
        self.last_update_ms = now_ms;

        for speaker in self.speakers.values_mut() {
            speaker.immediate.update(false, elapsed);
            speaker.medium.update(false, elapsed);
            speaker.long.update(false, elapsed);
        }

        let speaker = self.speakers.entry(producer_id.to_string()).or_insert_with(Speaker::new);
        speaker.immediate.update(active, elapsed);
        speaker.medium.update(active, elapsed);
        speaker.long.update(active, elapsed);
        if active {
            speaker.last_active_ms = now_ms;
            speaker.soft_paused = false;
        }

        self.evict_idle(now_ms);
        self.recompute_dominant(now_ms)
    }

    fn evict_idle(&mut self, now_ms: u64) {
        for speaker in self.speakers.values_mut() {
            if now_ms.saturating_sub(speaker.last_active_ms) > IDLE_TIMEOUT_MS {
                speaker.soft_paused = true;
            }
        }
    }

    fn recompute_dominant(&mut self, _now_ms: u64) -> Option<String> {
        let current = self.dominant.clone();
        let mut best: Option<(&String, f64, f64)> = None;

        // Only a speaker with some immediate activity can challenge the
        // current dominant; an always-silent speaker's long-window level
        // sits near zero too, which would otherwise make its own silence
        // look like evidence for itself under the LLR below.
        for (id, speaker) in self.speakers.iter() {
            if speaker.soft_paused || speaker.immediate.level < ACTIVITY_THRESHOLD {
                continue;
            }
            if current.as_deref() == Some(id.as_str()) {
                continue;
            }
            let llr = match &current {
                Some(dominant_id) => speaker.llr_against(&self.speakers[dominant_id]),
                None => speaker.immediate.level,
            };
            match best {
                Some((_, best_llr, best_medium)) if llr < best_llr || (llr == best_llr && speaker.medium.level <= best_medium) => {}
                _ => best = Some((id, llr, speaker.medium.level)),
            }
        }

        match best {
            Some((id, llr, _)) if llr > 0.0 => {
                self.dominant = Some(id.clone());
                self.dominant.clone()
            }
            _ => None,
        }
    }
}

impl Default for ActiveSpeakerObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustained_speaker_becomes_dominant() {
        let mut obs = ActiveSpeakerObserver::new();
        let mut changed = None;
        for t in (0..3_000).step_by(20) {
            if let Some(c) = obs.add_activity("p1", true, t) {
                changed = Some(c);
            }
            obs.add_activity("p2", false, t);
        }
        assert_eq!(changed.as_deref(), Some("p1"));
        assert_eq!(obs.dominant.as_deref(), Some("p1"));
    }

    #[test]
    fn idle_speaker_is_soft_paused_after_timeout() {
        let mut obs = ActiveSpeakerObserver::new();
        obs.add_activity("p1", true, 0);
        obs.evict_idle(20_000);
        assert!(obs.speakers.get("p1").unwrap().soft_paused);
    }
}

