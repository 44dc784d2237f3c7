// ── Take ownership of a factory-reset switch ──
//
// Two writes, each judged before the next:
//   1. as admin/admin, replace the credentials with the operator's;
//   2. as the new identity, pin a static management address.
// A factory-reset switch acknowledges step 1 with a LOGIN reply and error
// code 0. Anything else means it was not at the default identity, and
// step 2 must not run.

use std::net::Ipv4Addr;

use easysmart_api::OpCode;
use serde::Serialize;
use strum::Display;
use tracing::{info, warn};

use crate::client::{Ack, Credentials, OwnershipClient};
use crate::error::CoreError;
use crate::model::NetworkConfig;

/// Address a newly owned switch should end up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnershipTarget {
    pub switch_ip: Ipv4Addr,
    pub ip_mask: Ipv4Addr,
    /// The host's own address on the switch subnet.
    pub gateway: Ipv4Addr,
}

impl OwnershipTarget {
    pub fn desired(&self) -> NetworkConfig {
        NetworkConfig {
            dhcp: false,
            ip_addr: self.switch_ip,
            ip_mask: self.ip_mask,
            gateway: self.gateway,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    FactoryDefault,
    CredentialsSet,
    NetworkConfigured,
}

pub struct Bootstrap<C> {
    client: C,
    credentials: Credentials,
    target: OwnershipTarget,
    state: BootstrapState,
}

impl<C: OwnershipClient> Bootstrap<C> {
    /// `credentials` is the identity the switch will answer to afterwards.
    pub fn new(client: C, credentials: Credentials, target: OwnershipTarget) -> Self {
        Self {
            client,
            credentials,
            target,
            state: BootstrapState::FactoryDefault,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns whether the switch needed (or, with `dry_run`, would need)
    /// any change.
    pub async fn take_ownership(&mut self, dry_run: bool) -> Result<bool, CoreError> {
        let desired = self.target.desired();
        let actual = self.client.get_network_config().await?;
        if actual == desired {
            info!(ip = %desired.ip_addr, "switch already owned");
            self.state = BootstrapState::NetworkConfigured;
            return Ok(false);
        }

        info!(
            dry_run,
            current_ip = %actual.ip_addr,
            dhcp = actual.dhcp,
            target_ip = %desired.ip_addr,
            "taking ownership"
        );
        if dry_run {
            return Ok(true);
        }

        let ack = self
            .client
            .change_credentials(&Credentials::factory_default(), &self.credentials)
            .await?;
        if ack.op_code != OpCode::LoginReply || ack.error_code != 0 {
            warn!(
                op = ?ack.op_code,
                error_code = ack.error_code,
                "default credentials were refused; has the switch been reset?"
            );
            return Err(rejected("change default credentials", OpCode::LoginReply, ack));
        }
        self.state = BootstrapState::CredentialsSet;
        info!(username = %self.credentials.username, "credentials set");

        let ack = self
            .client
            .set_network_config(&self.credentials, &desired)
            .await
            .map_err(|err| self.partial(err))?;
        if ack.error_code != 0 {
            let err = rejected("set network config", ack.op_code, ack);
            return Err(self.partial(err));
        }
        self.state = BootstrapState::NetworkConfigured;
        info!(ip = %desired.ip_addr, gateway = %desired.gateway, "network configured");
        Ok(true)
    }

    fn partial(&self, err: CoreError) -> CoreError {
        CoreError::PartiallyApplied {
            applied: self.state.to_string(),
            source: Box::new(err),
        }
    }
}

/// A wrong reply kind wins over its error code; the code means nothing then.
fn rejected(operation: &str, expected: OpCode, ack: Ack) -> CoreError {
    if ack.op_code != expected {
        return CoreError::UnexpectedReply {
            operation: operation.to_owned(),
            expected,
            received: ack.op_code,
        };
    }
    CoreError::DeviceRejected {
        operation: operation.to_owned(),
        error_code: ack.error_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desired_config_is_static() {
        let target = OwnershipTarget {
            switch_ip: Ipv4Addr::new(10, 1, 0, 2),
            ip_mask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(10, 1, 0, 1),
        };
        let desired = target.desired();
        assert!(!desired.dhcp);
        assert_eq!(desired.ip_addr, target.switch_ip);
        assert_eq!(desired.gateway, target.gateway);
    }

    #[test]
    fn state_names() {
        assert_eq!(BootstrapState::CredentialsSet.to_string(), "credentials_set");
    }
}
