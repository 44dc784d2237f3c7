// ── Frame assembly ──
//
// plain frame  = header (32 bytes) ++ entries ++ end marker (ff ff 00 00)
// wire frame   = cipher(plain frame)

use bytes::{Buf, BufMut};
use tracing::trace;

use super::DecodeError;
use super::cipher;
use super::header::{HEADER_LEN, Header};
use super::property::Property;
use crate::error::Error;

/// Terminates every payload.
pub const END_MARKER: [u8; 4] = [0xff, 0xff, 0x00, 0x00];

const ENTRY_HEADER_LEN: usize = 4;

/// Serialize `header` and `payload` into a plain (un-obfuscated) frame.
///
/// `check_length` is always recomputed from the assembled size.
pub fn assemble(header: &Header, payload: &[Property]) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    for property in payload {
        property.encode(&mut body)?;
    }
    body.put_slice(&END_MARKER);

    let total = HEADER_LEN + body.len();
    let check_length = u16::try_from(total).map_err(|_| Error::Encode {
        property: "frame",
        reason: format!("frame of {total} bytes exceeds the u16 length field"),
    })?;
    let header = Header {
        check_length,
        ..*header
    };

    let mut frame = Vec::with_capacity(total);
    header.write(&mut frame);
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Split a plain frame into header and payload bytes.
pub fn split(frame: &[u8]) -> Result<(&[u8], &[u8]), DecodeError> {
    if frame.len() < HEADER_LEN {
        return Err(DecodeError::Truncated {
            needed: HEADER_LEN,
            available: frame.len(),
        });
    }
    Ok(frame.split_at(HEADER_LEN))
}

/// Decode header bytes.
pub fn interpret_header(bytes: &[u8]) -> Result<Header, DecodeError> {
    Header::read(bytes)
}

/// Decode payload bytes up to the end marker.
pub fn interpret_payload(mut bytes: &[u8]) -> Result<Vec<Property>, DecodeError> {
    let mut properties = Vec::new();
    loop {
        if bytes.len() < ENTRY_HEADER_LEN {
            return Err(DecodeError::MissingEndMarker {
                offset: HEADER_LEN,
            });
        }
        let id = bytes.get_u16();
        let len = usize::from(bytes.get_u16());
        if id == 0xffff {
            return Ok(properties);
        }
        if bytes.len() < len {
            return Err(DecodeError::Overrun {
                id,
                length: len,
                remaining: bytes.len(),
            });
        }
        let (value, rest) = bytes.split_at(len);
        properties.push(Property::decode(id, value)?);
        bytes = rest;
    }
}

/// Assemble and obfuscate a frame, ready for the wire.
pub fn encode_packet(header: &Header, payload: &[Property]) -> Result<Vec<u8>, Error> {
    let frame = assemble(header, payload)?;
    trace!(frame = %hex::encode(&frame), "assembled frame");
    Ok(cipher::encode(&frame))
}

/// Remove the obfuscation only; structure is parsed by [`parse_frame`].
pub fn decode_packet(wire: &[u8]) -> Vec<u8> {
    cipher::decode(wire)
}

/// De-obfuscate, split and interpret a received frame.
pub fn parse_frame(wire: &[u8]) -> Result<(Header, Vec<Property>), DecodeError> {
    let frame = decode_packet(wire);
    trace!(frame = %hex::encode(&frame), "received frame");
    let (header, payload) = split(&frame)?;
    Ok((interpret_header(header)?, interpret_payload(payload)?))
}
