//! ICE-lite controlled responder. A `IceServer` never initiates
//! connectivity checks; it only answers STUN Binding requests that arrive
//! on any of the transport's owned tuples, tracks which tuples are alive,
//! and honors `USE-CANDIDATE` nomination. Grounded in
//! `original_source/worker/src/RTC/IceServer.cpp`, expressed with the
//! `stun` crate for message parsing.

use std::collections::VecDeque;
use std::fmt;

use rand::Rng;
use stun::attributes::{ATTR_ICE_CONTROLLED, ATTR_ICE_CONTROLLING, ATTR_PRIORITY, ATTR_USE_CANDIDATE};
use stun::error_code::ErrorCodeAttribute;
use stun::fingerprint::FINGERPRINT;
use stun::integrity::MessageIntegrity;
use stun::message::{
    Getter, Message, MessageClass, MessageType, BINDING_SUCCESS, CLASS_ERROR_RESPONSE,
    CLASS_REQUEST, METHOD_BINDING,
};
use stun::textattrs::Username;
use stun::xoraddr::XorMappedAddress;

use crate::transport::TransportTuple;

pub const ICE_UFRAG_LENGTH: usize = 16;
pub const ICE_PASSWORD_LENGTH: usize = 32;

/// Tuples are considered disconnected after this many milliseconds without
/// valid traffic.
pub const ICE_TUPLE_LIVENESS_TIMEOUT_MS: u64 = 15_000;

pub const CODE_BAD_REQUEST: u16 = 400;
pub const CODE_UNAUTHORIZED: u16 = 401;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceState {
    New,
    Connected,
    Completed,
    Disconnected,
}

impl fmt::Display for IceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IceState::New => "new",
            IceState::Connected => "connected",
            IceState::Completed => "completed",
            IceState::Disconnected => "disconnected",
        };
        write!(f, "{s}")
    }
}

/// Event emitted synchronously from within a single `process_stun_packet`
/// call; the listener observes these in emission order.
#[derive(Debug, Clone)]
pub enum IceEvent {
    StateChanged(IceState),
    TupleAdded(TransportTuple),
    SelectedTupleChanged(Option<TransportTuple>),
}

struct LiveTuple {
    tuple: TransportTuple,
    last_valid_traffic_ms: u64,
}

pub struct IceServer {
    local_ufrag: String,
    local_password: String,
    remote_ufrag: Option<String>,
    state: IceState,
    tuples: Vec<LiveTuple>,
    selected: Option<TransportTuple>,
    nominated: bool,
    events: VecDeque<IceEvent>,
}

fn random_ice_string(len: usize) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

impl IceServer {
    pub fn new() -> Self {
        Self {
            local_ufrag: random_ice_string(ICE_UFRAG_LENGTH),
            local_password: random_ice_string(ICE_PASSWORD_LENGTH),
            remote_ufrag: None,
            state: IceState::New,
            tuples: Vec::new(),
            selected: None,
            nominated: false,
            events: VecDeque::new(),
        }
    }

    pub fn local_ufrag(&self) -> &str {
        &self.local_ufrag
    }

    pub fn local_password(&self) -> &str {
        &self.local_password
    }

    pub fn state(&self) -> IceState {
        self.state
    }

    pub fn selected_tuple(&self) -> Option<&TransportTuple> {
        self.selected.as_ref()
    }

    pub fn poll_event(&mut self) -> Option<IceEvent> {
        self.events.pop_front()
    }

    /// Every live tuple is reachable by the remote peer; used by tests
    /// and by the selected-tuple invariant check.
    pub fn live_tuples(&self) -> impl Iterator<Item = &TransportTuple> {
        self.tuples.iter().map(|t| &t.tuple)
    }

    pub fn restart(&mut self) {
        self.local_ufrag = random_ice_string(ICE_UFRAG_LENGTH);
        self.local_password = random_ice_string(ICE_PASSWORD_LENGTH);
        self.remote_ufrag = None;
        self.tuples.clear();
        self.selected = None;
        self.nominated = false;
        self.set_state(IceState::New);
    }

    fn set_state(&mut self, state: IceState) {
        if self.state != state {
            self.state = state;
            self.events.push_back(IceEvent::StateChanged(state));
        }
    }

    fn set_selected(&mut self, tuple: Option<TransportTuple>) {
        if self.selected != tuple {
            self.selected = tuple.clone();
            self.events.push_back(IceEvent::SelectedTupleChanged(tuple));
        }
    }

    fn touch_tuple(&mut self, tuple: &TransportTuple, now_ms: u64) -> bool {
        if let Some(existing) = self.tuples.iter_mut().find(|t| &t.tuple == tuple) {
            existing.last_valid_traffic_ms = now_ms;
            false
        } else {
            self.tuples.push(LiveTuple {
                tuple: tuple.clone(),
                last_valid_traffic_ms: now_ms,
            });
            self.events.push_back(IceEvent::TupleAdded(tuple.clone()));
            true
        }
    }

    pub fn remove_tuple(&mut self, tuple: &TransportTuple) {
        self.tuples.retain(|t| &t.tuple != tuple);
        if self.selected.as_ref() == Some(tuple) {
            self.set_selected(None);
            if matches!(self.state, IceState::Connected | IceState::Completed) {
                self.set_state(IceState::Disconnected);
            }
        }
    }

    /// Liveness sweep: called once per tick with the current monotonic time.
    pub fn check_timeouts(&mut self, now_ms: u64) {
        let stale: Vec<TransportTuple> = self
            .tuples
            .iter()
            .filter(|t| now_ms.saturating_sub(t.last_valid_traffic_ms) > ICE_TUPLE_LIVENESS_TIMEOUT_MS)
            .map(|t| t.tuple.clone())
            .collect();
        for tuple in stale {
            self.remove_tuple(&tuple);
        }
    }

    /// Handles one inbound STUN packet on `tuple`. Returns the serialized
    /// STUN response to send back, if any.
    pub fn process_stun_packet(
        &mut self,
        data: &[u8],
        tuple: &TransportTuple,
        now_ms: u64,
    ) -> Option<Vec<u8>> {
        let mut msg = Message::new();
        if msg.unmarshal_binary(data).is_err() {
            return None;
        }

        if msg.typ.class != CLASS_REQUEST || msg.typ.method != METHOD_BINDING {
            // Only Binding requests are meaningful to an ICE-lite responder;
            // anything else is silently dropped (spec: malformed -> drop).
            return None;
        }

        let mut username = Username::new(stun::attributes::ATTR_USERNAME, String::new());
        if username.get_from(&msg).is_err() {
            return Some(self.error_response(&msg, CODE_BAD_REQUEST, "missing USERNAME"));
        }

        // USERNAME is "<remote-ufrag>:<local-ufrag>"; we are addressed by
        // the local half.
        let parts: Vec<&str> = username.text.splitn(2, ':').collect();
        if parts.len() != 2 || parts[1] != self.local_ufrag {
            return Some(self.error_response(&msg, CODE_BAD_REQUEST, "unknown username fragment"));
        }
        self.remote_ufrag = Some(parts[0].to_string());

        let integrity = MessageIntegrity::new_short_term_integrity(self.local_password.clone());
        if integrity.check(&mut msg).is_err() {
            return Some(self.error_response(&msg, CODE_UNAUTHORIZED, "bad message integrity"));
        }

        let use_candidate = msg.contains(ATTR_USE_CANDIDATE);
        let _controlling_or_controlled =
            msg.contains(ATTR_ICE_CONTROLLED) || msg.contains(ATTR_ICE_CONTROLLING);
        let _priority = msg.get(ATTR_PRIORITY).ok();

        let is_new = self.touch_tuple(tuple, now_ms);
        if is_new && matches!(self.state, IceState::New) {
            self.set_state(IceState::Connected);
        }

        if use_candidate {
            self.nominated = true;
            self.set_selected(Some(tuple.clone()));
            self.set_state(IceState::Completed);
        } else if self.selected.is_none() {
            // No nomination yet: most-recently-valid tuple is tentatively
            // preferred until one is nominated.
            self.set_selected(Some(tuple.clone()));
        }

        Some(self.success_response(&msg, tuple))
    }

    fn success_response(&self, request: &Message, tuple: &TransportTuple) -> Vec<u8> {
        let mut response = Message::new();
        response.typ = MessageType::new(METHOD_BINDING, binding_success_class());
        response.transaction_id = request.transaction_id;

        let xor_addr = XorMappedAddress {
            ip: tuple.remote.ip(),
            port: tuple.remote.port(),
        };
        let integrity = MessageIntegrity::new_short_term_integrity(self.local_password.clone());
        response
            .build(&[Box::new(xor_addr), Box::new(integrity), Box::new(FINGERPRINT)])
            .expect("building a STUN success response never fails");
        response.raw
    }

    fn error_response(&self, request: &Message, code: u16, reason: &str) -> Vec<u8> {
        let mut response = Message::new();
        response.typ = MessageType::new(METHOD_BINDING, CLASS_ERROR_RESPONSE);
        response.transaction_id = request.transaction_id;
        let error = ErrorCodeAttribute {
            code: stun::error_code::ErrorCode(code),
            reason: reason.as_bytes().to_vec(),
        };
        let _ = response.build(&[Box::new(error)]);
        response.raw
    }
}

impl Default for IceServer {
    fn default() -> Self {
        Self::new()
    }
}

fn binding_success_class() -> MessageClass {
    BINDING_SUCCESS.class
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use stun::agent::TransactionId;
    use stun::attributes::RawAttribute;
    use stun::message::Setter;

    fn tuple(port: u16) -> TransportTuple {
        TransportTuple {
            protocol: crate::transport::TransportProtocol::Udp,
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 40000),
            remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port),
        }
    }

    fn build_binding_request(server: &IceServer, use_candidate: bool) -> Vec<u8> {
        let mut msg = Message::new();
        msg.typ = MessageType::new(METHOD_BINDING, CLASS_REQUEST);
        msg.transaction_id = TransactionId::new();
        let username = Username::new(
            stun::attributes::ATTR_USERNAME,
            format!("remote:{}", server.local_ufrag()),
        );
        let integrity = MessageIntegrity::new_short_term_integrity(server.local_password().to_string());
        let mut setters: Vec<Box<dyn Setter>> = vec![
            Box::new(username),
            Box::new(RawAttribute {
                typ: ATTR_PRIORITY,
                value: 0x6e7f1eff_u32.to_be_bytes().to_vec(),
                ..Default::default()
            }),
        ];
        if use_candidate {
            setters.push(Box::new(RawAttribute {
                typ: ATTR_USE_CANDIDATE,
                value: vec![],
                ..Default::default()
            }));
        }
        setters.push(Box::new(integrity));
        setters.push(Box::new(FINGERPRINT));
        msg.build(&setters).unwrap();
        msg.raw
    }

    #[test]
    fn binding_with_use_candidate_completes_and_selects_tuple() {
        let mut server = IceServer::new();
        let t = tuple(50000);
        let req = build_binding_request(&server, true);
        let resp = server.process_stun_packet(&req, &t, 0);
        assert!(resp.is_some());
        assert_eq!(server.state(), IceState::Completed);
        assert_eq!(server.selected_tuple(), Some(&t));
        assert!(server.live_tuples().any(|lt| lt == &t));
    }

    #[test]
    fn bad_integrity_is_rejected() {
        let mut server = IceServer::new();
        let t = tuple(50001);
        let mut msg = Message::new();
        msg.typ = MessageType::new(METHOD_BINDING, CLASS_REQUEST);
        msg.transaction_id = TransactionId::new();
        let username = Username::new(
            stun::attributes::ATTR_USERNAME,
            format!("remote:{}", server.local_ufrag()),
        );
        let bad_integrity = MessageIntegrity::new_short_term_integrity("wrong".to_string());
        msg.build(&[Box::new(username), Box::new(bad_integrity)]).unwrap();
        let resp = server.process_stun_packet(&msg.raw, &t, 0).unwrap();
        let mut parsed = Message::new();
        parsed.unmarshal_binary(&resp).unwrap();
        assert_eq!(parsed.typ.class, CLASS_ERROR_RESPONSE);
        assert_eq!(server.state(), IceState::New);
    }

    #[test]
    fn selected_tuple_is_always_live() {
        let mut server = IceServer::new();
        let t = tuple(50002);
        let req = build_binding_request(&server, true);
        server.process_stun_packet(&req, &t, 0);
        server.remove_tuple(&t);
        assert!(server.selected_tuple().is_none());
    }
}
