//! PlainTransport: a plain (non-ICE) UDP transport, optionally
//! SRTP-protected . No DTLS handshake: SRTP
//! keys, when used, are provisioned directly by the controller rather
//! than negotiated.

use crate::srtp_session::SrtpSession;
use crate::transport::{Transport, TransportCore, TransportTuple};
use crate::utils::Id;

pub struct PlainTransport {
    core: TransportCore,
    pub remote_tuple: Option<TransportTuple>,
    pub srtp_send: Option<SrtpSession>,
    pub srtp_recv: Option<SrtpSession>,
    pub comedia: bool,
}

impl PlainTransport {
    pub fn new(id: Id, comedia: bool) -> Self {
        Self { core: TransportCore::new(id), remote_tuple: None, srtp_send: None, srtp_recv: None, comedia }
    }

    /// COMEDIA mode learns the remote tuple from the first received
    /// packet instead of requiring an explicit `connect()`.
    pub fn learn_remote_tuple(&mut self, tuple: TransportTuple) -> bool {
        if self.comedia && self.remote_tuple.is_none() {
            self.remote_tuple = Some(tuple);
            true
        } else {
            false
        }
    }
}

impl Transport for PlainTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransportCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportProtocol;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn tuple() -> TransportTuple {
        TransportTuple {
            protocol: TransportProtocol::Udp,
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 10_000),
            remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 20_000),
        }
    }

    #[test]
    fn comedia_learns_tuple_once() {
        let mut t = PlainTransport::new("pt1".to_string(), true);
        assert!(t.learn_remote_tuple(tuple()));
        assert!(!t.learn_remote_tuple(tuple()));
    }

    #[test]
    fn non_comedia_never_learns_a_tuple() {
        let mut t = PlainTransport::new("pt1".to_string(), false);
        assert!(!t.learn_remote_tuple(tuple()));
    }
}
