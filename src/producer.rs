//! Producer: the controller-facing handle for one sender's RTP encodings
//! . Grounded in `original_source/worker/src/RTC/Producer.cpp`
//! for the encoding-lookup/pause/key-frame-coalescing behavior, which has
//! no teacher counterpart; per-stream bookkeeping reuses `RtpStreamRecv`.

use std::collections::HashMap;

use crate::rtp_ext::ExtensionMap;
use crate::rtp_stream::{RtpStreamParams, RtpStreamRecv};
use crate::utils::time::NtpTime;
use crate::utils::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// One simulcast/SVC spatial layer as negotiated with the controller.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub ssrc: u32,
    pub rtx_ssrc: Option<u32>,
    pub rid: Option<String>,
}

/// Events a Producer raises to the Router, which fans them out to bound
/// consumers and observers.
#[derive(Debug, Clone)]
pub enum ProducerEvent {
    NewRtpStream { ssrc: u32 },
    RtpStreamScore { ssrc: u32, score: u8 },
}

pub struct Producer {
    pub id: Id,
    pub kind: MediaKind,
    pub mime_type: String,
    pub clock_rate: u32,
    pub extension_map: ExtensionMap,
    pub encodings: Vec<Encoding>,
    pub paused: bool,
    streams: HashMap<u32, RtpStreamRecv>,
    /// Last PLI/FIR request time per ssrc, to coalesce at most one per
    /// 500 ms.
    last_keyframe_request_ms: HashMap<u32, u64>,
    pub pending_events: Vec<ProducerEvent>,
}

const KEYFRAME_REQUEST_INTERVAL_MS: u64 = 500;

impl Producer {
    pub fn new(id: Id, kind: MediaKind, mime_type: String, clock_rate: u32, encodings: Vec<Encoding>) -> Self {
        Self {
            id,
            kind,
            mime_type,
            clock_rate,
            extension_map: ExtensionMap::default(),
            encodings,
            paused: false,
            streams: HashMap::new(),
            last_keyframe_request_ms: HashMap::new(),
            pending_events: Vec::new(),
        }
    }

    /// Resolves the ssrc from either the packet's own ssrc or a `rid`
    /// extension value.
    pub fn resolve_encoding(&self, ssrc: u32, rid: Option<&str>) -> Option<&Encoding> {
        if let Some(enc) = self.encodings.iter().find(|e| e.ssrc == ssrc || e.rtx_ssrc == Some(ssrc)) {
            return Some(enc);
        }
        rid.and_then(|r| self.encodings.iter().find(|e| e.rid.as_deref() == Some(r)))
    }

    /// Feeds a media packet (not RTX). Returns `false` if the packet was
    /// dropped (paused producer, or no matching encoding).
    pub fn receive_media(&mut self, ssrc: u32, rid: Option<&str>, seq: u16, rtp_ts: u32, len: usize, arrival_ms: u64) -> bool {
        if self.paused {
            return false;
        }
        let Some(enc) = self.resolve_encoding(ssrc, rid) else {
            return false;
        };
        let enc_ssrc = enc.ssrc;
        let is_new = !self.streams.contains_key(&enc_ssrc);
        let mime_type = self.mime_type.clone();
        let clock_rate = self.clock_rate;
        let stream = self.streams.entry(enc_ssrc).or_insert_with(|| {
            RtpStreamRecv::new(RtpStreamParams {
                ssrc: enc_ssrc,
                payload_type: 0,
                clock_rate,
                mime_type,
            })
        });
        stream.receive(seq, rtp_ts, len, arrival_ms);
        if is_new {
            self.pending_events.push(ProducerEvent::NewRtpStream { ssrc: enc_ssrc });
        }
        true
    }

    /// Decodes and re-feeds an RTX packet: the 2-byte OSN prefix becomes
    /// the restored sequence number, and the RTX ssrc maps back to the
    /// media ssrc.
    pub fn receive_rtx(&mut self, rtx_ssrc: u32, osn_and_payload: &[u8], rtp_ts: u32, arrival_ms: u64) -> bool {
        if osn_and_payload.len() < 2 {
            return false;
        }
        let Some(enc) = self.encodings.iter().find(|e| e.rtx_ssrc == Some(rtx_ssrc)) else {
            return false;
        };
        let media_ssrc = enc.ssrc;
        let osn = u16::from_be_bytes([osn_and_payload[0], osn_and_payload[1]]);
        let payload_len = osn_and_payload.len() - 2;
        self.receive_media(media_ssrc, None, osn, rtp_ts, payload_len, arrival_ms)
    }

    pub fn stream(&self, ssrc: u32) -> Option<&RtpStreamRecv> {
        self.streams.get(&ssrc)
    }

    pub fn stream_mut(&mut self, ssrc: u32) -> Option<&mut RtpStreamRecv> {
        self.streams.get_mut(&ssrc)
    }

    /// Recomputes each stream's score and raises `RtpStreamScore` for any
    /// that changed. Called once per RTCP interval by the owning Transport.
    pub fn tick_scores(&mut self) {
        for stream in self.streams.values_mut() {
            let fraction_lost = stream.fraction_lost_since_last_report();
            let before = stream.score;
            stream.update_score(fraction_lost, 0.0);
            if stream.score != before {
                self.pending_events.push(ProducerEvent::RtpStreamScore {
                    ssrc: stream.params.ssrc,
                    score: stream.score,
                });
            }
        }
    }

    pub fn on_sender_report(&mut self, ssrc: u32, ntp: NtpTime, rtp_timestamp: u32) {
        if let Some(stream) = self.streams.get_mut(&ssrc) {
            stream.on_sender_report(ntp, rtp_timestamp);
        }
    }

    /// Returns `true` if a key-frame request for `ssrc` should actually be
    /// sent now, coalescing bursts from multiple consumers into at most one
    /// per 500 ms.
    pub fn should_request_keyframe(&mut self, ssrc: u32, now_ms: u64) -> bool {
        match self.last_keyframe_request_ms.get(&ssrc) {
            Some(&last) if now_ms.saturating_sub(last) < KEYFRAME_REQUEST_INTERVAL_MS => false,
            _ => {
                self.last_keyframe_request_ms.insert(ssrc, now_ms);
                true
            }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer() -> Producer {
        Producer::new(
            "p1".to_string(),
            MediaKind::Video,
            "video/VP8".to_string(),
            90_000,
            vec![Encoding { ssrc: 111, rtx_ssrc: Some(222), rid: Some("high".to_string()) }],
        )
    }

    #[test]
    fn paused_producer_drops_media() {
        let mut p = producer();
        p.pause();
        assert!(!p.receive_media(111, None, 1, 0, 100, 0));
    }

    #[test]
    fn unknown_ssrc_without_matching_rid_is_dropped() {
        let mut p = producer();
        assert!(!p.receive_media(999, Some("low"), 1, 0, 100, 0));
    }

    #[test]
    fn first_packet_on_a_stream_raises_new_rtp_stream() {
        let mut p = producer();
        assert!(p.receive_media(111, None, 1, 0, 100, 0));
        assert!(matches!(p.pending_events[0], ProducerEvent::NewRtpStream { ssrc: 111 }));
    }

    #[test]
    fn rtx_packet_restores_original_sequence_and_ssrc() {
        let mut p = producer();
        let payload = [0x00, 0x05, 0xAA, 0xBB];
        assert!(p.receive_rtx(222, &payload, 3000, 33));
        assert!(p.stream(111).is_some());
    }

    #[test]
    fn keyframe_requests_are_coalesced_within_window() {
        let mut p = producer();
        assert!(p.should_request_keyframe(111, 0));
        assert!(!p.should_request_keyframe(111, 100));
        assert!(p.should_request_keyframe(111, 500));
    }
}
