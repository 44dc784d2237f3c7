// easysmart-api: wire codec and UDP session for TP-Link Easy Smart switches

pub mod codec;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod session;
pub mod transport;

pub use codec::{
    DecodeError, Header, MacAddr, OpCode, PortPvid, PortStatus, Property, PropertyId, VlanEntry,
};
pub use error::Error;
pub use session::{Reply, Session, SessionConfig};
pub use transport::{Egress, Transport, UdpTransport};
