// ── Declarative port/VLAN reconciliation ──
//
// read_state → validate → normalize → diff → ordered apply.

pub mod diff;
pub mod normalize;
pub mod plan;

use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::client::SwitchClient;
use crate::error::CoreError;
use crate::model::{Declaration, SwitchState};

pub use diff::{ConfigDiff, FieldDiff, MembershipDiff, PortDiff, VlanChange, VlanDiff};
pub use normalize::{DesiredPort, DesiredState, normalize, validate};
pub use plan::{Phase, Plan};

/// Validate `declaration` against `actual` and diff the two.
pub fn plan(actual: &SwitchState, declaration: &Declaration) -> Result<ConfigDiff, CoreError> {
    validate(declaration, actual)?;
    let desired = normalize(declaration, actual)?;
    Ok(ConfigDiff::compute(actual, &desired))
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub changed: bool,
    pub diff: ConfigDiff,
}

/// Drives one switch towards a declaration.
pub struct Reconciler<C> {
    client: C,
}

impl<C: SwitchClient> Reconciler<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Read ports, PVIDs and VLANs into one snapshot.
    pub async fn read_state(&mut self) -> Result<SwitchState, CoreError> {
        let vlan_enabled = self.client.get_vlan_enabled().await?;
        let ports = self.client.get_ports().await?;
        let pvids = self.client.get_pvids().await?;
        let vlans = self.client.get_vlans().await?;
        debug!(
            ports = ports.len(),
            vlans = vlans.len(),
            vlan_enabled,
            "read switch state"
        );
        Ok(SwitchState::from_parts(vlan_enabled, ports, &pvids, vlans))
    }

    /// Push `diff` to the switch phase by phase. Returns whether any
    /// phase had work; with `dry_run` the phases are only logged.
    ///
    /// A failure stops at once. If earlier phases were already written the
    /// error is wrapped in [`CoreError::PartiallyApplied`].
    pub async fn apply(&mut self, diff: &ConfigDiff, dry_run: bool) -> Result<bool, CoreError> {
        let plan = Plan::from_diff(diff);
        let mut applied: Vec<Phase> = Vec::new();

        for phase in Phase::iter() {
            let count = plan.len(phase);
            if count == 0 {
                continue;
            }
            info!(dry_run, %phase, count, "applying phase");
            if !dry_run {
                if let Err(err) = self.run(phase, &plan).await {
                    return Err(partially_applied(&applied, err));
                }
            }
            applied.push(phase);
        }

        Ok(!applied.is_empty())
    }

    /// Read, plan and apply in one go.
    pub async fn reconcile(
        &mut self,
        declaration: &Declaration,
        dry_run: bool,
    ) -> Result<Outcome, CoreError> {
        let actual = self.read_state().await?;
        let diff = plan(&actual, declaration)?;
        let changed = self.apply(&diff, dry_run).await?;
        Ok(Outcome { changed, diff })
    }

    async fn run(&mut self, phase: Phase, plan: &Plan) -> Result<(), CoreError> {
        match phase {
            Phase::VlanMode => {
                if let Some(enabled) = plan.vlan_enabled {
                    debug!(enabled, "setting vlan mode");
                    self.client.set_vlan_enabled(enabled).await?;
                }
            }
            Phase::PortAttributes => {
                for port in &plan.ports {
                    debug!(port = port.port, enabled = port.is_enabled(), "modifying port");
                }
                self.client.set_ports(&plan.ports).await?;
            }
            Phase::AddToVlans => {
                for vlan in &plan.add_vlans {
                    debug!(vlan_id = vlan.vlan_id, name = %vlan.name, "adding ports to vlan");
                    self.client.set_vlan(vlan).await?;
                }
            }
            Phase::Pvids => {
                for pvid in &plan.pvids {
                    debug!(port = pvid.port, pvid = pvid.pvid, "modifying pvid");
                }
                self.client.set_pvids(&plan.pvids).await?;
            }
            Phase::FinalMembership => {
                for vlan in &plan.vlans {
                    debug!(vlan_id = vlan.vlan_id, name = %vlan.name, "setting vlan membership");
                    self.client.set_vlan(vlan).await?;
                }
            }
        }
        Ok(())
    }
}

fn partially_applied(applied: &[Phase], err: CoreError) -> CoreError {
    if applied.is_empty() {
        return err;
    }
    let applied = applied
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    CoreError::PartiallyApplied {
        applied,
        source: Box::new(err),
    }
}
