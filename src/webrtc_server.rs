//! WebRtcServer: a shared set of UDP sockets/TCP listeners multiplexing
//! many WebRtcTransports . Demuxes each arriving datagram by
//! STUN username fragment first (to catch a transport before its tuple is
//! known), falling back to the tuple hash once one exists; an existing
//! tuple match wins over a ufrag match to avoid ufrag-reuse races.

use std::collections::HashMap;

use crate::transport::TransportTuple;
use crate::utils::Id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemuxResult {
    ByTuple(Id),
    ByUfrag(Id),
    Unroutable,
}

#[derive(Default)]
pub struct WebRtcServer {
    by_ufrag: HashMap<String, Id>,
    by_tuple: HashMap<TransportTuple, Id>,
}

impl WebRtcServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_ufrag(&mut self, ufrag: String, transport_id: Id) {
        self.by_ufrag.insert(ufrag, transport_id);
    }

    pub fn unregister_ufrag(&mut self, ufrag: &str) {
        self.by_ufrag.remove(ufrag);
    }

    pub fn register_tuple(&mut self, tuple: TransportTuple, transport_id: Id) {
        self.by_tuple.insert(tuple, transport_id);
    }

    pub fn unregister_tuple(&mut self, tuple: &TransportTuple) {
        self.by_tuple.remove(tuple);
    }

    /// Extracts the local username fragment from a STUN USERNAME
    /// attribute value of the form `localUfrag:remoteUfrag` (RFC 5389
    /// §15.3, ICE's `ice-ufrag:ice-ufrag` convention).
    pub fn local_ufrag_from_username(username: &str) -> Option<&str> {
        username.split(':').next()
    }

    /// Resolves an arriving datagram's owning transport. If the packet
    /// also matches an existing tuple, prefer the tuple lookup over the
    /// ufrag match (avoids ufrag reuse races).
    pub fn demux(&self, tuple: &TransportTuple, stun_username: Option<&str>) -> DemuxResult {
        if let Some(id) = self.by_tuple.get(tuple) {
            return DemuxResult::ByTuple(id.clone());
        }
        if let Some(username) = stun_username {
            if let Some(ufrag) = Self::local_ufrag_from_username(username) {
                if let Some(id) = self.by_ufrag.get(ufrag) {
                    return DemuxResult::ByUfrag(id.clone());
                }
            }
        }
        DemuxResult::Unroutable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportProtocol;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn tuple(remote_port: u16) -> TransportTuple {
        TransportTuple {
            protocol: TransportProtocol::Udp,
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 10_000),
            remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), remote_port),
        }
    }

    #[test]
    fn new_tuple_routes_by_username_fragment() {
        let mut server = WebRtcServer::new();
        server.register_ufrag("abcd".to_string(), "t1".to_string());
        assert_eq!(server.demux(&tuple(1), Some("abcd:xyz")), DemuxResult::ByUfrag("t1".to_string()));
    }

    #[test]
    fn existing_tuple_wins_over_ufrag_to_avoid_reuse_races() {
        let mut server = WebRtcServer::new();
        server.register_ufrag("abcd".to_string(), "t1".to_string());
        server.register_tuple(tuple(1), "t2".to_string());
        assert_eq!(server.demux(&tuple(1), Some("abcd:xyz")), DemuxResult::ByTuple("t2".to_string()));
    }

    #[test]
    fn unknown_packet_is_unroutable() {
        let server = WebRtcServer::new();
        assert_eq!(server.demux(&tuple(1), None), DemuxResult::Unroutable);
    }
}
