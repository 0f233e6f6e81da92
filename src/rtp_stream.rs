//! Per-SSRC RTP stream bookkeeping: jitter, loss, NACK buffering and score
//! , plus the sender/receiver-report pairing needed to
//! turn an RTCP SR into a usable NTP<->RTP-timestamp anchor. Grounded in
//! `original_source/worker/src/RTC/RtpStream.cpp` and `RtpStreamRecv.cpp`
//! (score/jitter/loss bookkeeping has no teacher counterpart); retransmit
//! framing reuses the `rtcp` crate's `TransportLayerNack`/`NackPair`, the
//! teacher's own RTCP dependency.

use std::collections::VecDeque;

use crate::transport::rate_estimator::RateEstimator;
use crate::utils::time::NtpTime;

/// How long a NACK'd sequence number is kept before being given up on.
const NACK_MAX_AGE_MS: u64 = 2_000;
const NACK_MAX_COUNT: usize = 1_000;

#[derive(Debug, Clone, Copy)]
struct NackEntry {
    seq: u16,
    first_seen_ms: u64,
}

/// Anchors an RTP timestamp to wall-clock time from the last RTCP SR seen
/// for this stream.
#[derive(Debug, Clone, Copy)]
pub struct SenderReportAnchor {
    pub ntp: NtpTime,
    pub rtp_timestamp: u32,
}

/// Shared per-SSRC parameters every stream direction carries.
#[derive(Debug, Clone)]
pub struct RtpStreamParams {
    pub ssrc: u32,
    pub payload_type: u8,
    pub clock_rate: u32,
    pub mime_type: String,
}

/// Receive-side stream: jitter/loss tracking, NACK buffer, and a score in
/// [0, 10] recomputed every RTCP interval.
pub struct RtpStreamRecv {
    pub params: RtpStreamParams,
    highest_seq: Option<u16>,
    cycles: u32,
    base_seq: u32,
    packets_received: u64,
    packets_lost_total: u64,
    expected_prior: u32,
    received_prior: u32,
    jitter: f64,
    last_arrival_ms: Option<u64>,
    last_rtp_timestamp: Option<u32>,
    nack_buffer: VecDeque<NackEntry>,
    pub score: u8,
    pub sender_report_anchor: Option<SenderReportAnchor>,
    rate: RateEstimator,
}

impl RtpStreamRecv {
    pub fn new(params: RtpStreamParams) -> Self {
        Self {
            params,
            highest_seq: None,
            cycles: 0,
            base_seq: 0,
            packets_received: 0,
            packets_lost_total: 0,
            expected_prior: 0,
            received_prior: 0,
            jitter: 0.0,
            last_arrival_ms: None,
            last_rtp_timestamp: None,
            nack_buffer: VecDeque::new(),
            score: 10,
            sender_report_anchor: None,
            rate: RateEstimator::new(2_000),
        }
    }

    /// Extended highest sequence number seen, RFC 3550 §A.1 style, with
    /// 16-bit wraparound tracked via `cycles`.
    pub fn extended_highest_sequence(&self) -> u32 {
        (self.cycles) | self.highest_seq.unwrap_or(0) as u32
    }

    /// Feeds one received packet. Returns the sequence numbers that should
    /// be NACK'd as a result (gaps newly opened by this arrival).
    pub fn receive(&mut self, seq: u16, rtp_timestamp: u32, len: usize, arrival_ms: u64) -> Vec<u16> {
        self.rate.add(len as u64, arrival_ms);
        self.packets_received += 1;

        let mut newly_missing = Vec::new();
        match self.highest_seq {
            None => {
                self.base_seq = seq as u32;
                self.highest_seq = Some(seq);
            }
            Some(prev) => {
                let delta = seq.wrapping_sub(prev);
                if delta != 0 && delta < 0x8000 {
                    // Forward in sequence space: any skipped seqs are newly lost.
                    if prev.wrapping_add(1) != seq {
                        let mut s = prev.wrapping_add(1);
                        while s != seq {
                            newly_missing.push(s);
                            self.nack_buffer.push_back(NackEntry { seq: s, first_seen_ms: arrival_ms });
                            s = s.wrapping_add(1);
                        }
                        self.packets_lost_total += newly_missing.len() as u64;
                    }
                    if seq < prev {
                        self.cycles = self.cycles.wrapping_add(0x1_0000);
                    }
                    self.highest_seq = Some(seq);
                } else {
                    // Out of order or a retransmit filling a known gap.
                    self.nack_buffer.retain(|e| e.seq != seq);
                }
            }
        }

        if let (Some(last_ts), Some(last_arrival)) = (self.last_rtp_timestamp, self.last_arrival_ms) {
            let arrival_delta = (arrival_ms.saturating_sub(last_arrival)) as f64 * self.params.clock_rate as f64 / 1000.0;
            let rtp_delta = rtp_timestamp.wrapping_sub(last_ts) as f64;
            let d = (arrival_delta - rtp_delta).abs();
            self.jitter += (d - self.jitter) / 16.0;
        }
        self.last_rtp_timestamp = Some(rtp_timestamp);
        self.last_arrival_ms = Some(arrival_ms);

        self.evict_nacks(arrival_ms);
        newly_missing
    }

    fn evict_nacks(&mut self, now_ms: u64) {
        while let Some(front) = self.nack_buffer.front() {
            if now_ms.saturating_sub(front.first_seen_ms) > NACK_MAX_AGE_MS {
                self.nack_buffer.pop_front();
            } else {
                break;
            }
        }
        while self.nack_buffer.len() > NACK_MAX_COUNT {
            self.nack_buffer.pop_front();
        }
    }

    pub fn pending_nacks(&self) -> Vec<u16> {
        self.nack_buffer.iter().map(|e| e.seq).collect()
    }

    pub fn jitter(&self) -> u32 {
        self.jitter as u32
    }

    pub fn fraction_lost_since_last_report(&mut self) -> u8 {
        let expected = self.extended_highest_sequence().wrapping_sub(self.base_seq);
        let expected_interval = expected.wrapping_sub(self.expected_prior);
        let received_interval = (self.packets_received as u32).wrapping_sub(self.received_prior);
        self.expected_prior = expected;
        self.received_prior = self.packets_received as u32;
        let lost_interval = expected_interval.saturating_sub(received_interval);
        if expected_interval == 0 || lost_interval == 0 {
            0
        } else {
            ((lost_interval as u64 * 256) / expected_interval as u64).min(255) as u8
        }
    }

    /// Recomputes `score` from loss fraction and discard rate, updated
    /// once per RTCP interval. `discard_rate` is in [0.0, 1.0].
    pub fn update_score(&mut self, fraction_lost: u8, discard_rate: f64) {
        let loss_ratio = fraction_lost as f64 / 256.0;
        let penalty = loss_ratio * 10.0 + discard_rate * 10.0;
        self.score = (10.0 - penalty).clamp(0.0, 10.0).round() as u8;
    }

    pub fn on_sender_report(&mut self, ntp: NtpTime, rtp_timestamp: u32) {
        self.sender_report_anchor = Some(SenderReportAnchor { ntp, rtp_timestamp });
    }
}

/// Send-side stream: forwards a producer's media after rewriting, tracking
/// what it has sent for SR generation and retransmit lookups.
pub struct RtpStreamSend {
    pub params: RtpStreamParams,
    pub packets_sent: u64,
    pub octets_sent: u64,
    pub last_rtp_timestamp: u32,
    pub last_sent_ms: u64,
    rate: RateEstimator,
}

impl RtpStreamSend {
    pub fn new(params: RtpStreamParams) -> Self {
        Self {
            params,
            packets_sent: 0,
            octets_sent: 0,
            last_rtp_timestamp: 0,
            last_sent_ms: 0,
            rate: RateEstimator::new(2_000),
        }
    }

    pub fn record_sent(&mut self, len: usize, rtp_timestamp: u32, now_ms: u64) {
        self.packets_sent += 1;
        self.octets_sent += len as u64;
        self.last_rtp_timestamp = rtp_timestamp;
        self.last_sent_ms = now_ms;
        self.rate.add(len as u64, now_ms);
    }

    pub fn bitrate_bps(&mut self, now_ms: u64) -> u64 {
        self.rate.rate_bps(now_ms)
    }
}
