//! Consumer: the controller-facing handle forwarding a bound Producer's
//! media to one Transport . Grounded in
//! `original_source/worker/src/RTC/Consumer.cpp` and its `Simple`/
//! `Simulcast`/`Svc`/`Pipe` subclasses, which have no teacher counterpart;
//! the rewrite math reuses `rtp_ext` and `RtpStreamSend`.

use crate::rtp_ext::ExtensionMap;
use crate::rtp_stream::{RtpStreamParams, RtpStreamSend};
use crate::utils::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerKind {
    Simple,
    Simulcast,
    Svc,
    Pipe,
}

/// Tracks the sequence-number and timestamp offsets needed to keep the
/// outgoing stream monotonic across layer switches (outgoing seq becomes
/// lastSent+1 at the first packet of a new layer).
#[derive(Debug, Default, Clone, Copy)]
struct RewriteState {
    seq_offset: i32,
    last_sent_seq: Option<u16>,
    ts_offset: i64,
    active: bool,
}

pub struct Consumer {
    pub id: Id,
    pub kind: ConsumerKind,
    pub producer_id: Id,
    pub out_ssrc: u32,
    pub extension_map: ExtensionMap,
    pub paused: bool,
    pub producer_paused: bool,
    /// Spatial layer the controller prefers; simulcast/SVC pick the best
    /// available layer at or below this.
    pub preferred_spatial_layer: Option<u8>,
    current_spatial_layer: Option<u8>,
    rewrite: RewriteState,
    stream: RtpStreamSend,
    pub score: u8,
}

impl Consumer {
    pub fn new(id: Id, kind: ConsumerKind, producer_id: Id, out_ssrc: u32, clock_rate: u32, mime_type: String) -> Self {
        Self {
            id,
            kind,
            producer_id,
            out_ssrc,
            extension_map: ExtensionMap::default(),
            paused: false,
            producer_paused: false,
            preferred_spatial_layer: None,
            current_spatial_layer: None,
            rewrite: RewriteState::default(),
            stream: RtpStreamSend::new(RtpStreamParams { ssrc: out_ssrc, payload_type: 0, clock_rate, mime_type }),
            score: 10,
        }
    }

    pub fn closed_to_media(&self) -> bool {
        self.paused || self.producer_paused
    }

    /// Simulcast/SVC layer selection: the best layer at or below the
    /// controller's preference whose score is known. `available` is the
    /// producer's current (layer, score) table. Switching only happens on
    /// key frames, enforced by the caller via `is_keyframe`.
    pub fn select_layer(&mut self, available: &[(u8, u8)], is_keyframe: bool) -> Option<u8> {
        if !matches!(self.kind, ConsumerKind::Simulcast | ConsumerKind::Svc) {
            return self.current_spatial_layer;
        }
        let pref = self.preferred_spatial_layer.unwrap_or(u8::MAX);
        let best = available.iter().filter(|(l, _)| *l <= pref).max_by_key(|(l, _)| *l).map(|(l, _)| *l);
        match best {
            Some(target) if Some(target) != self.current_spatial_layer => {
                // Picking an initial layer doesn't need to wait for a key
                // frame; nothing is flowing yet to interrupt. Switching away
                // from an already-selected layer does.
                if is_keyframe || self.current_spatial_layer.is_none() {
                    self.current_spatial_layer = Some(target);
                    self.rewrite.active = false; // force a fresh offset anchor on next packet
                }
                self.current_spatial_layer
            }
            other => other.or(self.current_spatial_layer),
        }
    }

    /// Rewrites ssrc, sequence number, timestamp and extensions in place,
    /// and records the send for stats/SR generation. `in_seq`/`in_ts` are
    /// the incoming (producer-side) values; returns the rewritten
    /// (seq, timestamp) pair the caller should apply to its packet clone.
    pub fn forward(&mut self, in_seq: u16, in_ts: u32, len: usize, now_ms: u64) -> (u16, u32) {
        if !self.rewrite.active {
            let next_out = self.rewrite.last_sent_seq.map(|s| s.wrapping_add(1)).unwrap_or(0);
            self.rewrite.seq_offset = next_out as i32 - in_seq as i32;
            self.rewrite.ts_offset = self.stream.last_rtp_timestamp as i64 - in_ts as i64;
            self.rewrite.active = true;
        }
        let out_seq = (in_seq as i32 + self.rewrite.seq_offset) as u16;
        let out_ts = (in_ts as i64 + self.rewrite.ts_offset) as u32;
        self.rewrite.last_sent_seq = Some(out_seq);
        self.stream.record_sent(len, out_ts, now_ms);
        (out_seq, out_ts)
    }

    pub fn producer_pause(&mut self) {
        self.producer_paused = true;
    }

    pub fn producer_resume(&mut self) {
        self.producer_paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.rewrite.active = false;
    }
}
