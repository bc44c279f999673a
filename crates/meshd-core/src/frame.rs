//! PANN frame wire format.
//!
//! A routing frame is a single length-prefixed record: one frame-type byte,
//! a varint payload length, then the payload fields in fixed order. Varints
//! are unsigned LEB128, so small sequence numbers and metrics stay compact
//! while the full u64/u32 ranges remain representable.
//!
//! Layout:
//!
//! ```text
//! frame_type   u8        0x00 = PANN
//! payload_len  uvarint
//! orig_addr    [u8; 6]
//! orig_sn      uvarint   u64
//! hop_count    u8
//! ttl          u8
//! target_addr  [u8; 6]
//! metric       uvarint   u32
//! is_gate      u8        nonzero = true
//! reply_req    u8        nonzero = true
//! ```

use crate::error::FrameError;
use crate::types::MacAddress;

/// Routing frame discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Pann = 0,
}

impl FrameType {
    pub fn from_u8(v: u8) -> Result<Self, FrameError> {
        match v {
            0 => Ok(FrameType::Pann),
            other => Err(FrameError::UnknownFrameType(other)),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// A proactive Path Announcement.
///
/// `reply_requested` is carried on the wire but unused by the processor; it
/// is preserved verbatim through decode/encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PannFrame {
    /// Originating station.
    pub orig_addr: MacAddress,
    /// Origin's sequence number, monotonic per origin.
    pub orig_sn: u64,
    /// Hops traversed so far.
    pub hop_count: u8,
    /// Remaining time-to-live.
    pub ttl: u8,
    /// Unicast target, or broadcast.
    pub target_addr: MacAddress,
    /// Cumulative path metric from the origin.
    pub metric: u32,
    /// Origin claims upstream connectivity.
    pub is_gate: bool,
    pub reply_requested: bool,
}

impl PannFrame {
    /// Serialize to wire bytes.
    #[must_use = "serialization produces a new Vec without modifying the frame"]
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(32);
        payload.extend_from_slice(self.orig_addr.as_ref());
        put_uvarint(&mut payload, self.orig_sn);
        payload.push(self.hop_count);
        payload.push(self.ttl);
        payload.extend_from_slice(self.target_addr.as_ref());
        put_uvarint(&mut payload, u64::from(self.metric));
        payload.push(u8::from(self.is_gate));
        payload.push(u8::from(self.reply_requested));

        let mut out = Vec::with_capacity(2 + payload.len());
        out.push(FrameType::Pann.to_u8());
        put_uvarint(&mut out, payload.len() as u64);
        out.extend_from_slice(&payload);
        out
    }

    /// Parse a frame from wire bytes.
    ///
    /// The input must contain exactly one frame; trailing bytes are an
    /// error since the transport carries one frame per datagram.
    #[must_use = "parsing may fail; check the Result"]
    pub fn decode(raw: &[u8]) -> Result<Self, FrameError> {
        let mut cursor = 0usize;

        let frame_type = *raw.first().ok_or(FrameError::Truncated {
            min: 1,
            actual: 0,
        })?;
        FrameType::from_u8(frame_type)?;
        cursor += 1;

        let declared = get_uvarint(raw, &mut cursor)?;
        let declared = usize::try_from(declared).map_err(|_| FrameError::LengthMismatch {
            declared: usize::MAX,
            actual: raw.len() - cursor,
        })?;
        let available = raw.len() - cursor;
        if declared > available {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: available,
            });
        }
        if declared < available {
            return Err(FrameError::TrailingBytes(available - declared));
        }

        let payload = &raw[cursor..cursor + declared];
        let mut pos = 0usize;

        let orig_addr = take_mac(payload, &mut pos)?;
        let orig_sn = get_uvarint(payload, &mut pos)?;
        let hop_count = take_u8(payload, &mut pos)?;
        let ttl = take_u8(payload, &mut pos)?;
        let target_addr = take_mac(payload, &mut pos)?;
        let metric_raw = get_uvarint(payload, &mut pos)?;
        let metric =
            u32::try_from(metric_raw).map_err(|_| FrameError::VarintOutOfRange(metric_raw))?;
        let is_gate = take_u8(payload, &mut pos)? != 0;
        let reply_requested = take_u8(payload, &mut pos)? != 0;

        if pos != payload.len() {
            return Err(FrameError::TrailingBytes(payload.len() - pos));
        }

        Ok(PannFrame {
            orig_addr,
            orig_sn,
            hop_count,
            ttl,
            target_addr,
            metric,
            is_gate,
            reply_requested,
        })
    }
}

/// Append an unsigned LEB128 varint.
fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Read an unsigned LEB128 varint at `*cursor`, advancing it.
fn get_uvarint(buf: &[u8], cursor: &mut usize) -> Result<u64, FrameError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*cursor).ok_or(FrameError::Truncated {
            min: *cursor + 1,
            actual: buf.len(),
        })?;
        *cursor += 1;

        // 10 bytes cover 70 bits; the 10th may only contribute the low bit.
        if shift >= 63 && byte > 1 {
            return Err(FrameError::VarintMalformed);
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(FrameError::VarintMalformed);
        }
    }
}

fn take_u8(buf: &[u8], cursor: &mut usize) -> Result<u8, FrameError> {
    let byte = *buf.get(*cursor).ok_or(FrameError::Truncated {
        min: *cursor + 1,
        actual: buf.len(),
    })?;
    *cursor += 1;
    Ok(byte)
}

fn take_mac(buf: &[u8], cursor: &mut usize) -> Result<MacAddress, FrameError> {
    let end = *cursor + 6;
    let slice = buf.get(*cursor..end).ok_or(FrameError::Truncated {
        min: end,
        actual: buf.len(),
    })?;
    *cursor = end;
    Ok(MacAddress::try_from(slice).expect("slice is exactly 6 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x02, 0, 0, 0, 0, last])
    }

    fn sample_frame() -> PannFrame {
        PannFrame {
            orig_addr: mac(0xaa),
            orig_sn: 5,
            hop_count: 2,
            ttl: 10,
            target_addr: MacAddress::BROADCAST,
            metric: 40,
            is_gate: true,
            reply_requested: false,
        }
    }

    #[test]
    fn round_trip_sample() {
        let frame = sample_frame();
        let decoded = PannFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn wire_layout_is_stable() {
        // type | len | orig | sn | hops | ttl | target | metric | flags
        let expected = concat!(
            "00",
            "12",
            "0200000000aa",
            "05",
            "02",
            "0a",
            "ffffffffffff",
            "28",
            "01",
            "00",
        );
        assert_eq!(hex::encode(sample_frame().encode()), expected);
    }

    #[test]
    fn round_trip_extremes() {
        let frame = PannFrame {
            orig_addr: MacAddress::new([0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa]),
            orig_sn: u64::MAX,
            hop_count: 255,
            ttl: 255,
            target_addr: MacAddress::ZERO,
            metric: u32::MAX,
            is_gate: false,
            reply_requested: true,
        };
        assert_eq!(PannFrame::decode(&frame.encode()).unwrap(), frame);
    }

    #[test]
    fn unknown_frame_type_rejected() {
        let mut raw = sample_frame().encode();
        raw[0] = 0x07;
        assert_eq!(
            PannFrame::decode(&raw),
            Err(FrameError::UnknownFrameType(0x07))
        );
    }

    #[test]
    fn empty_input_rejected() {
        assert_eq!(
            PannFrame::decode(&[]),
            Err(FrameError::Truncated { min: 1, actual: 0 })
        );
    }

    #[test]
    fn truncated_payload_rejected() {
        let raw = sample_frame().encode();
        // Chop mid-payload: the declared length no longer fits.
        let cut = &raw[..raw.len() - 3];
        assert!(matches!(
            PannFrame::decode(cut),
            Err(FrameError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut raw = sample_frame().encode();
        raw.push(0x00);
        assert_eq!(PannFrame::decode(&raw), Err(FrameError::TrailingBytes(1)));
    }

    #[test]
    fn inner_trailing_bytes_rejected() {
        // Hand-grow the payload and fix up the declared length.
        let frame = sample_frame();
        let encoded = frame.encode();
        let payload = &encoded[2..]; // sample payload length < 128, 1-byte varint
        let mut raw = vec![0x00, (payload.len() + 1) as u8];
        raw.extend_from_slice(payload);
        raw.push(0xab);
        assert_eq!(PannFrame::decode(&raw), Err(FrameError::TrailingBytes(1)));
    }

    #[test]
    fn metric_overflow_rejected() {
        // payload: mac(6) sn(1) hop(1) ttl(1) mac(6) metric(>u32) flags(2)
        let mut payload = Vec::new();
        payload.extend_from_slice(mac(0xaa).as_ref());
        payload.push(5);
        payload.push(2);
        payload.push(10);
        payload.extend_from_slice(MacAddress::BROADCAST.as_ref());
        // 2^33 as LEB128
        payload.extend_from_slice(&[0x80, 0x80, 0x80, 0x80, 0x20]);
        payload.push(1);
        payload.push(0);

        let mut raw = vec![0x00, payload.len() as u8];
        raw.extend_from_slice(&payload);
        assert_eq!(
            PannFrame::decode(&raw),
            Err(FrameError::VarintOutOfRange(1 << 33))
        );
    }

    #[test]
    fn overlong_varint_rejected() {
        let mut cursor = 0;
        let overlong = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(
            get_uvarint(&overlong, &mut cursor),
            Err(FrameError::VarintMalformed)
        );
    }

    #[test]
    fn varint_known_encodings() {
        for (value, bytes) in [
            (0u64, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7f]),
            (128, vec![0x80, 0x01]),
            (300, vec![0xac, 0x02]),
            (u64::MAX, vec![0xff; 9].into_iter().chain([0x01]).collect()),
        ] {
            let mut buf = Vec::new();
            put_uvarint(&mut buf, value);
            assert_eq!(buf, bytes, "encoding of {value}");

            let mut cursor = 0;
            assert_eq!(get_uvarint(&buf, &mut cursor).unwrap(), value);
            assert_eq!(cursor, buf.len());
        }
    }

    #[test]
    fn nonzero_flag_bytes_read_as_true() {
        let frame = sample_frame();
        let mut raw = frame.encode();
        let len = raw.len();
        raw[len - 1] = 0x02; // reply_requested
        let decoded = PannFrame::decode(&raw).unwrap();
        assert!(decoded.reply_requested);
    }
}
