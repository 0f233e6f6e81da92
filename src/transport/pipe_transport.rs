//! PipeTransport: inter-router UDP transport used to relay a producer
//! between two Router instances in the same process tree . No
//! ICE/DTLS; optionally SRTP-protected like `PlainTransport`, always
//! point-to-point with a fixed remote tuple set at creation.

use crate::srtp_session::SrtpSession;
use crate::transport::{Transport, TransportCore, TransportTuple};
use crate::utils::Id;

pub struct PipeTransport {
    core: TransportCore,
    pub remote_tuple: TransportTuple,
    pub srtp_send: Option<SrtpSession>,
    pub srtp_recv: Option<SrtpSession>,
}

impl PipeTransport {
    pub fn new(id: Id, remote_tuple: TransportTuple) -> Self {
        Self { core: TransportCore::new(id), remote_tuple, srtp_send: None, srtp_recv: None }
    }
}

impl Transport for PipeTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransportCore {
        &mut self.core
    }
}
