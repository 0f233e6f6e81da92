//! RTP header-extension in-place rewriting , layered over the
//! `rtp` crate's one-byte/two-byte extension storage. mediasoup keeps a
//! fixed table of "extension kinds" it knows how to read and rewrite;
//! ours is grounded in `original_source/worker/src/RTC/RtpPacket.cpp`'s
//! `SetExtensionMapping`/`Update*` family, expressed against `rtp::header::Header`
//! instead of a hand-rolled byte parser.

use bytes::{Bytes, BytesMut};
use rtp::header::Header;

/// The extension kinds the worker understands, independent of the
/// negotiated one-byte id a given producer/consumer assigned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Mid,
    Rid,
    RepairedRid,
    AbsSendTime,
    TransportWideCc,
    AudioLevel,
    VideoOrientation,
}

/// Maps extension kinds to the one-byte ids negotiated for a particular
/// producer or consumer. Ids are per-endpoint, so forwarding a packet from
/// a producer to a consumer rewrites each extension to the consumer's own
/// negotiated id.
#[derive(Debug, Clone, Default)]
pub struct ExtensionMap {
    mid: Option<u8>,
    rid: Option<u8>,
    repaired_rid: Option<u8>,
    abs_send_time: Option<u8>,
    transport_wide_cc: Option<u8>,
    audio_level: Option<u8>,
    video_orientation: Option<u8>,
}

impl ExtensionMap {
    pub fn set(&mut self, kind: ExtensionKind, id: u8) {
        let slot = match kind {
            ExtensionKind::Mid => &mut self.mid,
            ExtensionKind::Rid => &mut self.rid,
            ExtensionKind::RepairedRid => &mut self.repaired_rid,
            ExtensionKind::AbsSendTime => &mut self.abs_send_time,
            ExtensionKind::TransportWideCc => &mut self.transport_wide_cc,
            ExtensionKind::AudioLevel => &mut self.audio_level,
            ExtensionKind::VideoOrientation => &mut self.video_orientation,
        };
        *slot = Some(id);
    }

    pub fn id_of(&self, kind: ExtensionKind) -> Option<u8> {
        match kind {
            ExtensionKind::Mid => self.mid,
            ExtensionKind::Rid => self.rid,
            ExtensionKind::RepairedRid => self.repaired_rid,
            ExtensionKind::AbsSendTime => self.abs_send_time,
            ExtensionKind::TransportWideCc => self.transport_wide_cc,
            ExtensionKind::AudioLevel => self.audio_level,
            ExtensionKind::VideoOrientation => self.video_orientation,
        }
    }
}

/// Reads the extension payload for `kind`, if present under `map`.
pub fn get(header: &Header, map: &ExtensionMap, kind: ExtensionKind) -> Option<Bytes> {
    let id = map.id_of(kind)?;
    header.get_extension(id)
}

pub fn get_mid(header: &Header, map: &ExtensionMap) -> Option<String> {
    let payload = get(header, map, ExtensionKind::Mid)?;
    String::from_utf8(payload.to_vec()).ok()
}

pub fn get_rid(header: &Header, map: &ExtensionMap) -> Option<String> {
    let payload = get(header, map, ExtensionKind::Rid)?;
    String::from_utf8(payload.to_vec()).ok()
}

/// 24-bit fixed-point absolute send time, per RFC 6464's companion draft
/// (the `abs-send-time` URI).
pub fn get_abs_send_time(header: &Header, map: &ExtensionMap) -> Option<u32> {
    let payload = get(header, map, ExtensionKind::AbsSendTime)?;
    if payload.len() != 3 {
        return None;
    }
    Some(u32::from_be_bytes([0, payload[0], payload[1], payload[2]]))
}

/// In-place MID rewrite. Setting an extension that doesn't exist fails
/// gracefully by doing nothing: we only rewrite ids the producer/consumer
/// already negotiated and that are present on the packet.
pub fn update_mid(header: &mut Header, map: &ExtensionMap, mid: &str) {
    if let Some(id) = map.id_of(ExtensionKind::Mid) {
        if header.get_extension(id).is_some() {
            let _ = header.set_extension(id, Bytes::copy_from_slice(mid.as_bytes()));
        }
    }
}

pub fn update_rid(header: &mut Header, map: &ExtensionMap, kind: ExtensionKind, rid: &str) {
    debug_assert!(matches!(kind, ExtensionKind::Rid | ExtensionKind::RepairedRid));
    if let Some(id) = map.id_of(kind) {
        if header.get_extension(id).is_some() {
            let _ = header.set_extension(id, Bytes::copy_from_slice(rid.as_bytes()));
        }
    }
}

pub fn update_abs_send_time(header: &mut Header, map: &ExtensionMap, unix_ms: u64) {
    if let Some(id) = map.id_of(ExtensionKind::AbsSendTime) {
        if header.get_extension(id).is_some() {
            // Fixed point, 6.18 format: seconds in top 18 bits, fraction in bottom 6.
            let secs = unix_ms as f64 / 1000.0;
            let fixed = (secs.fract() * (1 << 18) as f64) as u32 | ((secs as u32 & 0x3F) << 18);
            let mut buf = BytesMut::with_capacity(3);
            let bytes = fixed.to_be_bytes();
            buf.extend_from_slice(&bytes[1..]);
            let _ = header.set_extension(id, buf.freeze());
        }
    }
}

/// Rewrites the transport-wide-cc sequence number used for congestion
/// control feedback. `seq` is the worker's own monotonically increasing
/// counter scoped to the transport, not the media sequence number.
pub fn update_transport_wide_cc(header: &mut Header, map: &ExtensionMap, seq: u16) {
    if let Some(id) = map.id_of(ExtensionKind::TransportWideCc) {
        if header.get_extension(id).is_some() {
            let _ = header.set_extension(id, Bytes::copy_from_slice(&seq.to_be_bytes()));
        }
    }
}

/// Reads the SSRC audio level extension (RFC 6464): a single byte, top bit
/// is the "voice activity" flag, low 7 bits are `-dBov` (0 = loudest).
pub fn get_audio_level_dbov(header: &Header, map: &ExtensionMap) -> Option<u8> {
    let payload = get(header, map, ExtensionKind::AudioLevel)?;
    payload.first().map(|b| b & 0x7F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtp::header::Header as RtpHeader;

    fn header_with_mid(id: u8, mid: &str) -> RtpHeader {
        let mut header = RtpHeader {
            extension: true,
            extension_profile: 0xBEDE,
            ..Default::default()
        };
        header
            .set_extension(id, Bytes::copy_from_slice(mid.as_bytes()))
            .unwrap();
        header
    }

    #[test]
    fn mid_round_trips_through_map() {
        let mut map = ExtensionMap::default();
        map.set(ExtensionKind::Mid, 3);
        let mut header = header_with_mid(3, "0");
        assert_eq!(get_mid(&header, &map).as_deref(), Some("0"));
        update_mid(&mut header, &map, "1");
        assert_eq!(get_mid(&header, &map).as_deref(), Some("1"));
    }

    #[test]
    fn rewrite_of_missing_extension_is_a_no_op() {
        let map = ExtensionMap::default();
        let mut header = header_with_mid(3, "0");
        // No id negotiated for Rid, so this must not panic or touch the packet.
        update_rid(&mut header, &map, ExtensionKind::Rid, "high");
        assert_eq!(header.get_extension(3).unwrap().as_ref(), b"0");
    }

    #[test]
    fn audio_level_masks_voice_activity_bit() {
        let mut map = ExtensionMap::default();
        map.set(ExtensionKind::AudioLevel, 1);
        let mut header = RtpHeader {
            extension: true,
            extension_profile: 0xBEDE,
            ..Default::default()
        };
        header.set_extension(1, Bytes::copy_from_slice(&[0x80 | 42])).unwrap();
        assert_eq!(get_audio_level_dbov(&header, &map), Some(42));
    }
}
