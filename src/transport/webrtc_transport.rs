//! WebRtcTransport: ICE + DTLS + SRTP over UDP/TCP //! "WebRtcTransport extends Transport"). Either owns its own sockets or
//! borrows a `WebRtcServer`'s; this struct models the owned state
//! (`IceServer`, `DtlsTransport`, the two `SrtpSession`s, candidate list,
//! selected tuple) that both cases share.


use crate::dtls_transport::{DtlsFingerprint, DtlsRole, DtlsTransport};
use crate::ice::IceServer;
use crate::srtp_session::SrtpSession;
use crate::transport::{Transport, TransportCore, TransportTuple};
use crate::utils::Id;

pub struct WebRtcTransport {
    core: TransportCore,
    pub ice_server: IceServer,
    pub dtls_transport: DtlsTransport,
    pub srtp_send: Option<SrtpSession>,
    pub srtp_recv: Option<SrtpSession>,
    pub selected_tuple: Option<TransportTuple>,
}

impl WebRtcTransport {
    pub fn new(id: Id, ice_server: IceServer, dtls_transport: DtlsTransport) -> Self {
        Self {
            core: TransportCore::new(id),
            ice_server,
            dtls_transport,
            srtp_send: None,
            srtp_recv: None,
            selected_tuple: None,
        }
    }

    /// Called once the DTLS handshake yields exported keying material:
    /// hands both directions to the listener which constructs the inbound
    /// and outbound SrtpSessions.
    pub fn install_srtp_sessions(&mut self, send: SrtpSession, recv: SrtpSession) {
        self.srtp_send = Some(send);
        self.srtp_recv = Some(recv);
        self.dtls_transport.mark_connected();
    }

    pub fn remote_fingerprint(&mut self, fingerprint: DtlsFingerprint) {
        self.dtls_transport.set_remote_fingerprint(fingerprint);
    }

    pub fn dtls_role(&self) -> DtlsRole {
        self.dtls_transport.role
    }
}

impl Transport for WebRtcTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransportCore {
        &mut self.core
    }

    fn close(&mut self) {
        self.core.closed = true;
        self.dtls_transport.close();
        self.srtp_send = None;
        self.srtp_recv = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::dtls_transport::DtlsCertificate;
    use crate::ice::IceServer;

    fn transport() -> WebRtcTransport {
        let cert = Arc::new(DtlsCertificate::generate_self_signed().unwrap());
        let ice = IceServer::new();
        let dtls = DtlsTransport::new(cert, DtlsRole::Server);
        WebRtcTransport::new("t1".to_string(), ice, dtls)
    }

    #[test]
    fn closing_tears_down_srtp_and_dtls() {
        let mut t = transport();
        t.close();
        assert!(t.srtp_send.is_none());
        assert!(t.closed());
    }
}
