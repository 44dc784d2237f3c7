// easysmart-core: switch state model, typed client, VLAN reconciler and
// ownership bootstrap on top of easysmart-api.

pub mod client;
pub mod error;
pub mod model;
pub mod ownership;
pub mod reconcile;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{Ack, Credentials, DeviceClient, OwnershipClient, SwitchClient};
pub use error::CoreError;
pub use ownership::{Bootstrap, BootstrapState, OwnershipTarget};
pub use reconcile::{ConfigDiff, Outcome, Phase, Plan, Reconciler, plan};

pub use model::{
    Declaration, DeviceInfo, LinkSpeed, NetworkConfig, Port, PortDecl, PortRef, SwitchState,
    Vlan, VlanDecl, VlanRef,
};
