//! Transport family: WebRTC (ICE+DTLS+SRTP), Plain, Pipe and Direct, plus
//! the shared bookkeeping every variant carries (byte counters, a sliding
//! rate estimator, and the RTCP send schedule). Polymorphism is expressed
//! as a tagged sum (`AnyTransport`) with a shared `Transport` trait, rather
//! than a trait object, to keep dispatch off the hot packet path.

pub mod direct_transport;
pub mod pipe_transport;
pub mod plain_transport;
pub mod rate_estimator;
pub mod webrtc_transport;

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::consumer::Consumer;
use crate::data_channel::{DataConsumer, DataProducer};
use crate::producer::Producer;
use crate::utils::Id;
use direct_transport::DirectTransport;
use pipe_transport::PipeTransport;
use plain_transport::PlainTransport;
use rate_estimator::RateEstimator;
use webrtc_transport::WebRtcTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportProtocol {
    Udp,
    Tcp,
}

/// A (protocol, local socket identity, remote sockaddr) triple. Equality
/// is protocol + local address + remote address, which is what the
/// `WebRtcServer` demux table hashes on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportTuple {
    pub protocol: TransportProtocol,
    pub local_addr: SocketAddr,
    pub remote: SocketAddr,
}

/// RTCP sender/receiver report cadence: 5 s for audio, 1 s for video,
/// jittered +-25% to avoid every stream's reports bunching up together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcpMediaKind {
    Audio,
    Video,
}

impl RtcpMediaKind {
    pub fn base_interval_ms(self) -> u64 {
        match self {
            RtcpMediaKind::Audio => 5_000,
            RtcpMediaKind::Video => 1_000,
        }
    }

    /// Jittered interval for the next RTCP send. `salt` is any stable
    /// per-stream value (e.g. ssrc) decorrelating multiple streams that
    /// would otherwise all fire on the same tick.
    pub fn jittered_interval_ms(self, salt: u32) -> u64 {
        let base = self.base_interval_ms();
        // +-25% jitter, deterministic from `salt` so ticks stay reproducible in tests.
        let span = base / 2; // 50% total span => +-25%
        let offset = (salt as u64) % (span + 1);
        base - span / 2 + offset
    }
}

/// Shared state every Transport variant owns.
pub struct TransportCore {
    pub id: Id,
    pub producers: HashMap<Id, Producer>,
    pub consumers: HashMap<Id, Consumer>,
    pub data_producers: HashMap<Id, DataProducer>,
    pub data_consumers: HashMap<Id, DataConsumer>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub send_rate: RateEstimator,
    pub recv_rate: RateEstimator,
    pub closed: bool,
}

impl TransportCore {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            producers: HashMap::new(),
            consumers: HashMap::new(),
            data_producers: HashMap::new(),
            data_consumers: HashMap::new(),
            bytes_sent: 0,
            bytes_received: 0,
            send_rate: RateEstimator::new(1_000),
            recv_rate: RateEstimator::new(1_000),
            closed: false,
        }
    }

    /// Accounts an outgoing payload. `bytes_sent` equals the sum over time
    /// of payload lengths passed to send.
    pub fn record_sent(&mut self, len: usize, now_ms: u64) {
        self.bytes_sent += len as u64;
        self.send_rate.add(len as u64, now_ms);
    }

    pub fn record_received(&mut self, len: usize, now_ms: u64) {
        self.bytes_received += len as u64;
        self.recv_rate.add(len as u64, now_ms);
    }
}

/// Narrow capability interface a Transport exposes to the Router and to
/// its owned Producers/Consumers.
pub trait Transport {
    fn core(&self) -> &TransportCore;
    fn core_mut(&mut self) -> &mut TransportCore;

    fn id(&self) -> &str {
        &self.core().id
    }

    fn bytes_sent(&self) -> u64 {
        self.core().bytes_sent
    }

    fn bytes_received(&self) -> u64 {
        self.core().bytes_received
    }

    fn close(&mut self) {
        self.core_mut().closed = true;
    }

    fn closed(&self) -> bool {
        self.core().closed
    }
}

/// Transport has four variants with distinct internal state ;
/// represented as a tagged sum rather than `Box<dyn Transport>` so the
/// Router never needs a dynamic cross-cast to reach variant-specific
/// fields (e.g. `WebRtcTransport::ice_server`).
pub enum AnyTransport {
    WebRtc(WebRtcTransport),
    Plain(PlainTransport),
    Pipe(PipeTransport),
    Direct(DirectTransport),
}

impl AnyTransport {
    pub fn as_transport(&self) -> &dyn Transport {
        match self {
            AnyTransport::WebRtc(t) => t,
            AnyTransport::Plain(t) => t,
            AnyTransport::Pipe(t) => t,
            AnyTransport::Direct(t) => t,
        }
    }

    pub fn as_transport_mut(&mut self) -> &mut dyn Transport {
        match self {
            AnyTransport::WebRtc(t) => t,
            AnyTransport::Plain(t) => t,
            AnyTransport::Pipe(t) => t,
            AnyTransport::Direct(t) => t,
        }
    }

    pub fn as_webrtc_mut(&mut self) -> Option<&mut WebRtcTransport> {
        match self {
            AnyTransport::WebRtc(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtcp_interval_is_within_jitter_band() {
        for salt in [0u32, 1, 1000, u32::MAX] {
            let ms = RtcpMediaKind::Video.jittered_interval_ms(salt);
            assert!((750..=1250).contains(&ms), "{ms} out of band for salt {salt}");
        }
    }

    #[test]
    fn byte_accounting_sums_sent_payloads() {
        let mut core = TransportCore::new("t1".to_string());
        core.record_sent(100, 0);
        core.record_sent(250, 10);
        assert_eq!(core.bytes_sent, 350);
    }
}
