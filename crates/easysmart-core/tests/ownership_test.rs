// Take-ownership runs against an in-memory switch that checks identities.

use std::net::Ipv4Addr;

use easysmart_api::OpCode;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use tokio_test::assert_ok;

use easysmart_core::{
    Ack, Bootstrap, BootstrapState, CoreError, Credentials, NetworkConfig, OwnershipClient,
    OwnershipTarget,
};

// ── Fake switch ─────────────────────────────────────────────────────

#[derive(Debug)]
struct FakeSwitch {
    username: String,
    password: String,
    config: NetworkConfig,
    calls: Vec<&'static str>,
    /// Overrides the acknowledgement of a credentials change.
    credentials_ack: Option<Ack>,
    network_error: u32,
}

impl FakeSwitch {
    fn factory_reset() -> Self {
        Self {
            username: "admin".into(),
            password: "admin".into(),
            config: NetworkConfig {
                dhcp: false,
                ip_addr: Ipv4Addr::new(192, 168, 0, 1),
                ip_mask: Ipv4Addr::new(255, 255, 255, 0),
                gateway: Ipv4Addr::UNSPECIFIED,
            },
            calls: Vec::new(),
            credentials_ack: None,
            network_error: 0,
        }
    }

    fn accepts(&self, credentials: &Credentials) -> bool {
        credentials.username == self.username
            && credentials.password.expose_secret() == self.password
    }
}

fn ack(error_code: u32) -> Ack {
    Ack {
        op_code: OpCode::LoginReply,
        error_code,
    }
}

impl OwnershipClient for FakeSwitch {
    async fn get_network_config(&mut self) -> Result<NetworkConfig, CoreError> {
        self.calls.push("get_network_config");
        Ok(self.config)
    }

    async fn change_credentials(
        &mut self,
        current: &Credentials,
        new: &Credentials,
    ) -> Result<Ack, CoreError> {
        self.calls.push("change_credentials");
        if let Some(ack) = self.credentials_ack {
            return Ok(ack);
        }
        if !self.accepts(current) {
            return Ok(ack(1));
        }
        self.username.clone_from(&new.username);
        self.password = new.password.expose_secret().to_owned();
        Ok(ack(0))
    }

    async fn set_network_config(
        &mut self,
        credentials: &Credentials,
        config: &NetworkConfig,
    ) -> Result<Ack, CoreError> {
        self.calls.push("set_network_config");
        if !self.accepts(credentials) {
            return Ok(ack(1));
        }
        if self.network_error != 0 {
            return Ok(ack(self.network_error));
        }
        self.config = *config;
        Ok(ack(0))
    }
}

fn target() -> OwnershipTarget {
    OwnershipTarget {
        switch_ip: Ipv4Addr::new(10, 1, 0, 2),
        ip_mask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(10, 1, 0, 1),
    }
}

fn bootstrap(switch: FakeSwitch) -> Bootstrap<FakeSwitch> {
    Bootstrap::new(switch, Credentials::new("admin2", "password2"), target())
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn takes_ownership_of_a_reset_switch() {
    let mut bootstrap = bootstrap(FakeSwitch::factory_reset());
    assert!(assert_ok!(bootstrap.take_ownership(false).await));
    assert_eq!(bootstrap.state(), BootstrapState::NetworkConfigured);

    let switch = bootstrap.client();
    assert_eq!(
        switch.calls,
        ["get_network_config", "change_credentials", "set_network_config"]
    );
    assert_eq!(switch.username, "admin2");
    assert_eq!(switch.config, target().desired());
}

#[tokio::test]
async fn owned_switch_is_left_alone() {
    let mut bootstrap = bootstrap(FakeSwitch::factory_reset());
    assert_ok!(bootstrap.take_ownership(false).await);
    assert!(!assert_ok!(bootstrap.take_ownership(false).await));
    assert_eq!(bootstrap.client().calls.len(), 4);
}

#[tokio::test]
async fn dry_run_only_reads() {
    let mut bootstrap = bootstrap(FakeSwitch::factory_reset());
    assert!(assert_ok!(bootstrap.take_ownership(true).await));
    assert_eq!(bootstrap.client().calls, ["get_network_config"]);
    assert_eq!(bootstrap.state(), BootstrapState::FactoryDefault);
}

#[tokio::test]
async fn refused_credentials_stop_before_network_config() {
    let mut switch = FakeSwitch::factory_reset();
    switch.password = "not-the-default".into();
    let mut bootstrap = bootstrap(switch);

    let err = bootstrap
        .take_ownership(false)
        .await
        .expect_err("switch is not at factory defaults");
    assert!(
        matches!(err, CoreError::DeviceRejected { error_code: 1, .. }),
        "{err:?}"
    );
    assert!(!bootstrap.client().calls.contains(&"set_network_config"));
    assert_eq!(bootstrap.state(), BootstrapState::FactoryDefault);
}

#[tokio::test]
async fn unexpected_reply_op_code_is_reported() {
    let mut switch = FakeSwitch::factory_reset();
    switch.credentials_ack = Some(Ack {
        op_code: OpCode::GetReply,
        error_code: 0,
    });
    let mut bootstrap = bootstrap(switch);

    let err = bootstrap
        .take_ownership(false)
        .await
        .expect_err("a GET reply does not acknowledge a credentials change");
    assert!(
        matches!(
            err,
            CoreError::UnexpectedReply {
                expected: OpCode::LoginReply,
                received: OpCode::GetReply,
                ..
            }
        ),
        "{err:?}"
    );
    assert!(err.to_string().contains("op code 2"), "{err}");
    assert!(!err.to_string().contains("error_code"), "{err}");
    assert_eq!(bootstrap.client().calls.len(), 2);
}

#[tokio::test]
async fn network_failure_after_credentials_is_partial() {
    let mut switch = FakeSwitch::factory_reset();
    switch.network_error = 3;
    let mut bootstrap = bootstrap(switch);

    let err = bootstrap
        .take_ownership(false)
        .await
        .expect_err("network config is rejected");
    let CoreError::PartiallyApplied { applied, .. } = &err else {
        panic!("expected a partial application, got {err:?}");
    };
    assert_eq!(applied, "credentials_set");
    assert!(matches!(err.root(), CoreError::DeviceRejected { error_code: 3, .. }));
    assert_eq!(bootstrap.state(), BootstrapState::CredentialsSet);
    assert_eq!(bootstrap.client().username, "admin2");
}
