// ── Typed switch client ──
//
// The reconciler and the ownership bootstrap never see frames or
// properties; they talk to the switch through the two traits below.
// `DeviceClient` implements both over a `Session`; tests substitute
// recording fakes.

use std::future::Future;

use easysmart_api::{
    OpCode, PortPvid, PortStatus, Property, PropertyId, Reply, Session, Transport, UdpTransport,
    VlanEntry,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DeviceInfo, NetworkConfig};

/// Identity used to authenticate writes.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// `admin` / `admin`, as shipped and after a reset.
    pub fn factory_default() -> Self {
        Self::new("admin", "admin")
    }
}

/// How the switch acknowledged a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub op_code: OpCode,
    pub error_code: u32,
}

impl From<&Reply> for Ack {
    fn from(reply: &Reply) -> Self {
        Self {
            op_code: reply.header.op_code,
            error_code: reply.header.error_code,
        }
    }
}

/// Port and VLAN operations used by the reconciler.
pub trait SwitchClient: Send {
    fn get_vlan_enabled(&mut self) -> impl Future<Output = Result<bool, CoreError>> + Send;

    fn get_ports(&mut self) -> impl Future<Output = Result<Vec<PortStatus>, CoreError>> + Send;

    fn get_pvids(&mut self) -> impl Future<Output = Result<Vec<PortPvid>, CoreError>> + Send;

    fn get_vlans(&mut self) -> impl Future<Output = Result<Vec<VlanEntry>, CoreError>> + Send;

    fn set_vlan_enabled(
        &mut self,
        enabled: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Push port settings; the `actual_*` fields are ignored by the switch.
    fn set_ports(
        &mut self,
        ports: &[PortStatus],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn set_pvids(
        &mut self,
        pvids: &[PortPvid],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Push a single VLAN. Several VLANs in one write corrupt their names
    /// on some firmware, so callers submit them one at a time.
    fn set_vlan(&mut self, vlan: &VlanEntry) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Management-plane operations used by the ownership bootstrap.
///
/// Writes return the raw acknowledgement; judging it is the caller's job.
pub trait OwnershipClient: Send {
    fn get_network_config(
        &mut self,
    ) -> impl Future<Output = Result<NetworkConfig, CoreError>> + Send;

    /// Authenticate as `current` and replace it with `new`.
    fn change_credentials(
        &mut self,
        current: &Credentials,
        new: &Credentials,
    ) -> impl Future<Output = Result<Ack, CoreError>> + Send;

    fn set_network_config(
        &mut self,
        credentials: &Credentials,
        config: &NetworkConfig,
    ) -> impl Future<Output = Result<Ack, CoreError>> + Send;
}

// ── DeviceClient ────────────────────────────────────────────────────

/// A [`Session`] bound to one identity.
#[derive(Debug)]
pub struct DeviceClient<T = UdpTransport> {
    session: Session<T>,
    credentials: Credentials,
}

impl<T: Transport> DeviceClient<T> {
    pub fn new(session: Session<T>, credentials: Credentials) -> Self {
        Self {
            session,
            credentials,
        }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Log in with the client's identity, failing on a non-zero error code.
    pub async fn login(&mut self) -> Result<(), CoreError> {
        let reply = self
            .session
            .login(
                &self.credentials.username,
                self.credentials.password.expose_secret(),
            )
            .await?;
        check("login", &reply)?;
        debug!(username = %self.credentials.username, "logged in");
        Ok(())
    }

    /// Unauthenticated identity read.
    pub async fn info(&mut self) -> Result<DeviceInfo, CoreError> {
        let reply = self.session.get(&[PropertyId::Hostname]).await?;
        let mut info = DeviceInfo::from_properties(&reply.payload);
        if info.num_ports.is_none() {
            let reply = self.session.get(&[PropertyId::NumPorts]).await?;
            info.num_ports = DeviceInfo::from_properties(&reply.payload).num_ports;
        }
        Ok(info)
    }

    async fn read(&mut self, id: PropertyId) -> Result<Reply, CoreError> {
        Ok(self.session.get(&[id]).await?)
    }

    async fn write(&mut self, operation: &str, properties: Vec<Property>) -> Result<(), CoreError> {
        let reply = self
            .session
            .set(
                &self.credentials.username,
                self.credentials.password.expose_secret(),
                properties,
            )
            .await?;
        check(operation, &reply)
    }
}

fn check(operation: &str, reply: &Reply) -> Result<(), CoreError> {
    if reply.is_success() {
        return Ok(());
    }
    warn!(
        operation,
        error_code = reply.header.error_code,
        "switch rejected request"
    );
    Err(CoreError::DeviceRejected {
        operation: operation.to_owned(),
        error_code: reply.header.error_code,
    })
}

impl<T: Transport> SwitchClient for DeviceClient<T> {
    async fn get_vlan_enabled(&mut self) -> Result<bool, CoreError> {
        let reply = self.read(PropertyId::VlanEnabled).await?;
        Ok(reply
            .payload
            .iter()
            .find_map(|p| match p {
                Property::VlanEnabled(enabled) => Some(*enabled),
                _ => None,
            })
            .unwrap_or(false))
    }

    async fn get_ports(&mut self) -> Result<Vec<PortStatus>, CoreError> {
        let reply = self.read(PropertyId::Ports).await?;
        Ok(reply
            .payload
            .iter()
            .filter_map(|p| match p {
                Property::Ports(status) => Some(*status),
                _ => None,
            })
            .collect())
    }

    async fn get_pvids(&mut self) -> Result<Vec<PortPvid>, CoreError> {
        let reply = self.read(PropertyId::Pvid).await?;
        Ok(reply
            .payload
            .iter()
            .filter_map(|p| match p {
                Property::Pvid(pvid) => Some(*pvid),
                _ => None,
            })
            .collect())
    }

    async fn get_vlans(&mut self) -> Result<Vec<VlanEntry>, CoreError> {
        let reply = self.read(PropertyId::Vlan).await?;
        Ok(reply
            .payload
            .iter()
            .filter_map(|p| match p {
                Property::Vlan(vlan) => Some(vlan.clone()),
                _ => None,
            })
            .collect())
    }

    async fn set_vlan_enabled(&mut self, enabled: bool) -> Result<(), CoreError> {
        self.write("set vlan_enabled", vec![Property::VlanEnabled(enabled)])
            .await
    }

    async fn set_ports(&mut self, ports: &[PortStatus]) -> Result<(), CoreError> {
        let properties = ports
            .iter()
            .map(|p| Property::Ports(p.with_enabled(p.is_enabled())))
            .collect();
        self.write("set ports", properties).await
    }

    async fn set_pvids(&mut self, pvids: &[PortPvid]) -> Result<(), CoreError> {
        let properties = pvids.iter().copied().map(Property::Pvid).collect();
        self.write("set pvids", properties).await
    }

    async fn set_vlan(&mut self, vlan: &VlanEntry) -> Result<(), CoreError> {
        let operation = format!("set vlan {}", vlan.vlan_id);
        self.write(&operation, vec![Property::Vlan(vlan.clone())])
            .await
    }
}

impl<T: Transport> OwnershipClient for DeviceClient<T> {
    async fn get_network_config(&mut self) -> Result<NetworkConfig, CoreError> {
        // Reading `dhcp` returns the whole addressing block, no login needed.
        let reply = self.read(PropertyId::Dhcp).await?;
        Ok(NetworkConfig::from_properties(&reply.payload))
    }

    async fn change_credentials(
        &mut self,
        current: &Credentials,
        new: &Credentials,
    ) -> Result<Ack, CoreError> {
        let properties = vec![
            Property::Password(current.password.expose_secret().to_owned()),
            Property::NewUsername(new.username.clone()),
            Property::NewPassword(new.password.expose_secret().to_owned()),
        ];
        let reply = self
            .session
            .set(
                &current.username,
                current.password.expose_secret(),
                properties,
            )
            .await?;
        Ok(Ack::from(&reply))
    }

    async fn set_network_config(
        &mut self,
        credentials: &Credentials,
        config: &NetworkConfig,
    ) -> Result<Ack, CoreError> {
        let reply = self
            .session
            .set(
                &credentials.username,
                credentials.password.expose_secret(),
                config.to_properties(),
            )
            .await?;
        Ok(Ack::from(&reply))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use easysmart_api::mock::{MockReply, MockTransport};
    use easysmart_api::{Header, MacAddr};
    use pretty_assertions::assert_eq;

    use super::*;

    fn port(port: u8) -> PortStatus {
        PortStatus {
            port,
            status: 1,
            lag: 0,
            speed: 1,
            actual_speed: 6,
            flow_control: 0,
            actual_flow_control: 1,
        }
    }

    /// Replies to reads with a fixed two-port, one-VLAN layout and
    /// acknowledges every write.
    fn switch(req: &Header, payload: &[Property]) -> Vec<MockReply> {
        if req.op_code == OpCode::Login {
            return vec![MockReply::to(req, OpCode::LoginReply, vec![])];
        }
        let answer = match payload.first() {
            Some(Property::Query(PropertyId::Ports)) => {
                vec![Property::Ports(port(1)), Property::Ports(port(2))]
            }
            Some(Property::Query(PropertyId::Pvid)) => vec![
                Property::Pvid(PortPvid { port: 1, pvid: 1 }),
                Property::Pvid(PortPvid { port: 2, pvid: 1 }),
                Property::Raw {
                    id: PropertyId::VlanFiller.id(),
                    value: bytes::Bytes::from_static(b" "),
                },
            ],
            Some(Property::Query(PropertyId::Vlan)) => vec![
                Property::VlanEnabled(true),
                Property::Vlan(VlanEntry {
                    vlan_id: 1,
                    member_ports: BTreeSet::from([1, 2]),
                    tagged_ports: BTreeSet::new(),
                    name: "Default".into(),
                }),
            ],
            Some(Property::Query(PropertyId::VlanEnabled)) => vec![Property::VlanEnabled(true)],
            _ => vec![],
        };
        vec![MockReply::to(req, OpCode::GetReply, answer).with_token(42)]
    }

    fn client(mock: &MockTransport) -> DeviceClient<MockTransport> {
        let session = Session::new(
            mock.clone(),
            MacAddr([2; 6]),
            MacAddr([1; 6]),
            Duration::from_secs(10),
        );
        DeviceClient::new(session, Credentials::new("admin", "secret"))
    }

    #[tokio::test]
    async fn reads_decode_typed_values() {
        let mock = MockTransport::respond_with(switch);
        let mut client = client(&mock);

        assert!(client.get_vlan_enabled().await.unwrap());
        assert_eq!(client.get_ports().await.unwrap(), vec![port(1), port(2)]);
        assert_eq!(client.get_pvids().await.unwrap().len(), 2);
        let vlans = client.get_vlans().await.unwrap();
        assert_eq!(vlans.len(), 1);
        assert_eq!(vlans[0].name, "Default");
    }

    #[tokio::test]
    async fn port_writes_zero_the_read_only_fields() {
        let mock = MockTransport::respond_with(switch);
        let mut client = client(&mock);
        client.set_ports(&[port(3)]).await.unwrap();

        let sent = mock.sent();
        let (_, payload) = sent.last().unwrap();
        let Some(Property::Ports(pushed)) = payload.last() else {
            panic!("expected a ports property, got {payload:?}");
        };
        assert_eq!(pushed.actual_speed, 0);
        assert_eq!(pushed.actual_flow_control, 0);
        assert_eq!(pushed.speed, 1);
    }

    #[tokio::test]
    async fn rejected_write_is_device_rejected() {
        let mock = MockTransport::respond_with(|req, _| {
            vec![MockReply::to(req, OpCode::LoginReply, vec![]).with_error(7)]
        });
        let err = client(&mock).set_vlan_enabled(true).await.unwrap_err();
        assert!(
            matches!(err, CoreError::DeviceRejected { error_code: 7, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn change_credentials_payload() {
        let mock = MockTransport::respond_with(switch);
        let ack = client(&mock)
            .change_credentials(
                &Credentials::factory_default(),
                &Credentials::new("admin2", "password2"),
            )
            .await
            .unwrap();
        assert_eq!(ack.op_code, OpCode::LoginReply);

        let sent = mock.sent();
        assert_eq!(
            sent[1].1,
            vec![
                Property::Username("admin".into()),
                Property::Password("admin".into()),
                Property::Password("admin".into()),
                Property::NewUsername("admin2".into()),
                Property::NewPassword("password2".into()),
            ]
        );
    }
}
