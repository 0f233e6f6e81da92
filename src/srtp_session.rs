//! SrtpSession: per-direction SRTP/SRTCP encrypt/decrypt,
//! wrapping the `srtp` crate's `Context`. One read context and one write
//! context per transport, keyed off the profile and keying material
//! exported from the DTLS handshake.

use bytes::Bytes;

use crate::error::FatalError;

/// Subset of `srtp::protection_profile::ProtectionProfile` the worker
/// negotiates: the two AES-CM/HMAC-SHA1 profiles and the two
/// AEAD_AES_{128,256}_GCM profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoSuite {
    AesCm128HmacSha1_80,
    AesCm128HmacSha1_32,
    AeadAes128Gcm,
    AeadAes256Gcm,
}

impl CryptoSuite {
    fn protection_profile(self) -> srtp::protection_profile::ProtectionProfile {
        use srtp::protection_profile::ProtectionProfile;
        match self {
            CryptoSuite::AesCm128HmacSha1_80 => ProtectionProfile::Aes128CmHmacSha1_80,
            CryptoSuite::AesCm128HmacSha1_32 => ProtectionProfile::Aes128CmHmacSha1_32,
            CryptoSuite::AeadAes128Gcm => ProtectionProfile::AeadAes128Gcm,
            CryptoSuite::AeadAes256Gcm => ProtectionProfile::AeadAes256Gcm,
        }
    }
}

/// One direction (encrypt or decrypt) of an SRTP/SRTCP session. The
/// `Context` type is intentionally one-way, so a transport owns two: a
/// `send` session built from the local export and a `recv` session built
/// from the remote export.
pub struct SrtpSession {
    context: srtp::context::Context,
}

impl SrtpSession {
    pub fn new(suite: CryptoSuite, master_key: &[u8], master_salt: &[u8]) -> Result<Self, FatalError> {
        let context = srtp::context::Context::new(master_key, master_salt, suite.protection_profile(), None, None)
            .map_err(|e| FatalError::Assertion(format!("failed to build SRTP context: {e}")))?;
        Ok(Self { context })
    }

    /// Encrypts one RTP packet in place, returning the SRTP ciphertext.
    /// Callers must have sized their buffer with the 16 trailing bytes
    /// SRTP authentication tags need.
    pub fn protect_rtp(&mut self, plaintext: &[u8]) -> Result<Bytes, FatalError> {
        self.context
            .encrypt_rtp(plaintext)
            .map_err(|e| FatalError::Assertion(format!("SRTP encrypt failed: {e}")))
    }

    /// Decrypts one SRTP packet. Authentication failure is a silent drop,
    /// not propagated as an error.
    pub fn unprotect_rtp(&mut self, ciphertext: &[u8]) -> Option<Bytes> {
        self.context.decrypt_rtp(ciphertext).ok()
    }

    pub fn protect_rtcp(&mut self, plaintext: &[u8]) -> Result<Bytes, FatalError> {
        self.context
            .encrypt_rtcp(plaintext)
            .map_err(|e| FatalError::Assertion(format!("SRTCP encrypt failed: {e}")))
    }

    pub fn unprotect_rtcp(&mut self, ciphertext: &[u8]) -> Option<Bytes> {
        self.context.decrypt_rtcp(ciphertext).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> (Vec<u8>, Vec<u8>) {
        (vec![0u8; 16], vec![0u8; 14])
    }

    #[test]
    fn round_trips_an_rtp_packet() {
        let (key, salt) = keys();
        let mut send = SrtpSession::new(CryptoSuite::AesCm128HmacSha1_80, &key, &salt).unwrap();
        let mut recv = SrtpSession::new(CryptoSuite::AesCm128HmacSha1_80, &key, &salt).unwrap();

        let mut rtp_packet = vec![0x80, 0x60, 0x00, 0x01, 0, 0, 0, 1, 0, 0, 0, 2];
        rtp_packet.extend_from_slice(b"hello world");

        let ciphertext = send.protect_rtp(&rtp_packet).unwrap();
        let plaintext = recv.unprotect_rtp(&ciphertext).unwrap();
        assert_eq!(plaintext.as_ref(), rtp_packet.as_slice());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let (key, salt) = keys();
        let mut send = SrtpSession::new(CryptoSuite::AesCm128HmacSha1_80, &key, &salt).unwrap();
        let mut recv = SrtpSession::new(CryptoSuite::AesCm128HmacSha1_80, &key, &salt).unwrap();

        let mut rtp_packet = vec![0x80, 0x60, 0x00, 0x01, 0, 0, 0, 1, 0, 0, 0, 2];
        rtp_packet.extend_from_slice(b"hello world");
        let mut ciphertext = send.protect_rtp(&rtp_packet).unwrap().to_vec();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        assert!(recv.unprotect_rtp(&ciphertext).is_none());
    }
}
