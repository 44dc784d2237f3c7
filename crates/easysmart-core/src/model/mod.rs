// Domain model: observed state, desired declaration, device identity.

pub mod declaration;
pub mod device;
pub mod state;

pub use declaration::{Declaration, PortDecl, PortRef, VlanDecl, VlanRef};
pub use device::{DeviceInfo, NetworkConfig};
pub use state::{LinkSpeed, Port, SwitchState, Vlan};
