// Wire codec
//
// Pure, stateless functions: frame obfuscation, header and payload
// (de)composition, and the typed property table. Nothing in here touches
// a socket.

mod cipher;
pub mod header;
pub mod packet;
pub mod property;

use thiserror::Error;

pub use header::{HEADER_LEN, Header, MacAddr, OpCode};
pub use packet::{
    END_MARKER, assemble, decode_packet, encode_packet, interpret_header, interpret_payload,
    parse_frame, split,
};
pub use property::{
    MAX_PORTS, PortPvid, PortStatus, Property, PropertyId, VlanEntry, bitmask_to_ports,
    ports_to_bitmask,
};

/// A frame that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame truncated: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("property {id} declares {length} bytes but only {remaining} remain")]
    Overrun {
        id: u16,
        length: usize,
        remaining: usize,
    },

    #[error("payload starting at offset {offset} has no end marker")]
    MissingEndMarker { offset: usize },

    #[error("invalid {length}-byte value for property '{property}'")]
    InvalidValue {
        property: &'static str,
        length: usize,
    },
}
