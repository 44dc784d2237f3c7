// Request/response session with one switch.
//
// The protocol has no request id beyond `(sequence_id, token_id)`, so a
// session runs exactly one exchange at a time: every operation takes
// `&mut self` and completes (or times out) before the next can start.
// Each send builds a fresh header from the session's current sequence and
// token rather than mutating a shared template.

use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace, warn};

use crate::codec::{Header, MacAddr, OpCode, Property, PropertyId, encode_packet, parse_frame};
use crate::error::Error;
use crate::transport::{Egress, RECEIVE_TIMEOUT, Transport, UdpTransport};

/// Sequence ids cycle through `0..SEQUENCE_MODULUS`.
pub const SEQUENCE_MODULUS: u16 = 1000;

/// Everything needed to open a [`Session`] over UDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub egress: Egress,
    /// MAC of the host interface the requests leave from.
    pub host_mac: MacAddr,
    /// Target switch; all-zero addresses any switch on the segment.
    pub switch_mac: MacAddr,
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(egress: Egress, host_mac: MacAddr, switch_mac: MacAddr) -> Self {
        Self {
            egress,
            host_mac,
            switch_mac,
            timeout: RECEIVE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub header: Header,
    pub payload: Vec<Property>,
}

impl Reply {
    /// Zero device error code.
    pub fn is_success(&self) -> bool {
        self.header.is_success()
    }

    /// Every entry with the given id, in payload order.
    pub fn properties(&self, id: PropertyId) -> impl Iterator<Item = &Property> {
        let id = id.id();
        self.payload.iter().filter(move |p| p.id() == id)
    }

    /// First entry with the given id.
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties(id).next()
    }
}

/// One conversation with one switch over a [`Transport`].
#[derive(Debug)]
pub struct Session<T = UdpTransport> {
    transport: T,
    host_mac: MacAddr,
    switch_mac: MacAddr,
    sequence_id: u16,
    token_id: u16,
    timeout: Duration,
}

impl Session<UdpTransport> {
    /// Bind the UDP sockets described by `config`.
    pub fn connect(config: &SessionConfig) -> Result<Self, Error> {
        let transport = UdpTransport::bind(&config.egress)?;
        Ok(Self::new(
            transport,
            config.host_mac,
            config.switch_mac,
            config.timeout,
        ))
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an existing transport, starting from a random sequence id.
    pub fn new(transport: T, host_mac: MacAddr, switch_mac: MacAddr, timeout: Duration) -> Self {
        Self {
            transport,
            host_mac,
            switch_mac,
            sequence_id: fastrand::u16(0..SEQUENCE_MODULUS),
            token_id: 0,
            timeout,
        }
    }

    /// Start from a fixed sequence id instead of a random one.
    #[must_use]
    pub fn with_sequence_id(mut self, sequence_id: u16) -> Self {
        self.sequence_id = sequence_id % SEQUENCE_MODULUS;
        self
    }

    /// Sequence id of the most recent request.
    pub fn sequence_id(&self) -> u16 {
        self.sequence_id
    }

    /// Token most recently issued by the switch (zero before the first reply).
    pub fn token_id(&self) -> u16 {
        self.token_id
    }

    pub fn host_mac(&self) -> MacAddr {
        self.host_mac
    }

    pub fn switch_mac(&self) -> MacAddr {
        self.switch_mac
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn next_header(&mut self, op_code: OpCode) -> Header {
        self.sequence_id = (self.sequence_id + 1) % SEQUENCE_MODULUS;
        Header {
            op_code,
            sequence_id: self.sequence_id,
            token_id: self.token_id,
            ..Header::new(self.host_mac, self.switch_mac)
        }
    }

    /// Broadcast one request. Returns the header that was sent.
    pub async fn send(&mut self, op_code: OpCode, payload: &[Property]) -> Result<Header, Error> {
        let header = self.next_header(op_code);
        let frame = encode_packet(&header, payload)?;
        debug!(
            seq = header.sequence_id,
            op = ?op_code,
            token = header.token_id,
            properties = payload.len(),
            "sending frame"
        );
        trace!(?payload, "request payload");
        self.transport
            .send(&frame)
            .await
            .map_err(|e| Error::connection(format!("send failed: {e}")))?;
        Ok(header)
    }

    /// Wait for the reply to the most recent request.
    ///
    /// Replies carrying another sequence id are stale broadcasts and are
    /// skipped until the deadline. Every failure, including a frame that
    /// does not decode, becomes [`Error::ConnectionProblem`].
    pub async fn receive(&mut self) -> Result<Reply, Error> {
        let expected = self.sequence_id;
        let wait = self.timeout;
        let deadline = Instant::now() + wait;
        loop {
            let wire = timeout_at(deadline, self.transport.recv())
                .await
                .map_err(|_| {
                    Error::timeout(format!("no reply to request {expected} within {wait:?}"))
                })?
                .map_err(|e| Error::connection(format!("receive failed: {e}")))?;

            let (header, payload) = parse_frame(&wire).map_err(|e| {
                warn!(error = %e, "undecodable reply");
                Error::connection(format!("undecodable reply: {e}"))
            })?;

            if header.sequence_id != expected {
                debug!(
                    seq = header.sequence_id,
                    expected, "discarding stale reply"
                );
                continue;
            }

            self.token_id = header.token_id;
            debug!(
                seq = header.sequence_id,
                op = ?header.op_code,
                error_code = header.error_code,
                token = header.token_id,
                properties = payload.len(),
                "received reply"
            );
            trace!(?payload, "reply payload");
            return Ok(Reply { header, payload });
        }
    }

    /// Send then receive.
    pub async fn query(&mut self, op_code: OpCode, payload: &[Property]) -> Result<Reply, Error> {
        self.send(op_code, payload).await?;
        self.receive().await
    }

    /// Unauthenticated read of the given properties.
    pub async fn get(&mut self, ids: &[PropertyId]) -> Result<Reply, Error> {
        let payload: Vec<Property> = ids.iter().copied().map(Property::Query).collect();
        self.query(OpCode::Get, &payload).await
    }

    async fn fetch_token(&mut self) -> Result<(), Error> {
        self.get(&[PropertyId::GetTokenId]).await?;
        Ok(())
    }

    /// Obtain a token, then log in. The reply is returned unexamined.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Reply, Error> {
        self.fetch_token().await?;
        self.query(OpCode::Login, &credentials(username, password))
            .await
    }

    /// Authenticated write: every call re-authenticates in the same frame.
    pub async fn set(
        &mut self,
        username: &str,
        password: &str,
        properties: Vec<Property>,
    ) -> Result<Reply, Error> {
        self.fetch_token().await?;
        let mut payload = credentials(username, password);
        payload.extend(properties);
        self.query(OpCode::Login, &payload).await
    }
}

fn credentials(username: &str, password: &str) -> Vec<Property> {
    vec![
        Property::Username(username.to_owned()),
        Property::Password(password.to_owned()),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::{MockReply, MockTransport};

    const SWITCH: MacAddr = MacAddr([0x50, 0xd4, 0xf7, 0x3c, 0xa6, 0xa1]);
    const HOST: MacAddr = MacAddr([0x52, 0x54, 0x00, 0x83, 0xc8, 0x8b]);

    fn session(mock: &MockTransport) -> Session<MockTransport> {
        Session::new(mock.clone(), HOST, SWITCH, RECEIVE_TIMEOUT)
    }

    #[test]
    fn initial_sequence_is_in_range() {
        for _ in 0..50 {
            assert!(session(&MockTransport::new()).sequence_id() < SEQUENCE_MODULUS);
        }
    }

    #[tokio::test]
    async fn sequence_wraps_after_a_thousand_sends() {
        let mock = MockTransport::new();
        let mut session = session(&mock).with_sequence_id(998);
        let start = session.sequence_id();
        session.send(OpCode::Get, &[]).await.unwrap();
        assert_eq!(session.sequence_id(), 999);
        session.send(OpCode::Get, &[]).await.unwrap();
        assert_eq!(session.sequence_id(), 0);
        for _ in 2..1000 {
            session.send(OpCode::Get, &[]).await.unwrap();
        }
        assert_eq!(session.sequence_id(), start);
        assert_eq!(mock.sent().len(), 1000);
    }

    #[tokio::test]
    async fn requests_carry_endpoints_and_cached_token() {
        let mock = MockTransport::respond_with(|req, _| {
            vec![MockReply::to(req, OpCode::GetReply, vec![]).with_token(0x7777)]
        });
        let mut session = session(&mock).with_sequence_id(265);

        assert_eq!(session.token_id(), 0);
        session.get(&[PropertyId::NumPorts]).await.unwrap();
        assert_eq!(session.token_id(), 0x7777);
        session.get(&[PropertyId::Hostname]).await.unwrap();

        let sent = mock.sent();
        assert_eq!(sent[0].0.token_id, 0);
        assert_eq!(sent[0].0.sequence_id, 266);
        assert_eq!(sent[1].0.token_id, 0x7777);
        assert_eq!(sent[1].0.sequence_id, 267);
        for (header, _) in &sent {
            assert_eq!(header.host_mac, HOST);
            assert_eq!(header.switch_mac, SWITCH);
            assert_eq!(header.version, 1);
        }
    }

    #[tokio::test]
    async fn stale_replies_are_discarded() {
        let mock = MockTransport::respond_with(|req, _| {
            let stale = (req.sequence_id + SEQUENCE_MODULUS - 1) % SEQUENCE_MODULUS;
            vec![
                MockReply::to(req, OpCode::GetReply, vec![Property::NumPorts(5)])
                    .with_sequence(stale)
                    .with_token(1),
                MockReply::to(req, OpCode::GetReply, vec![Property::NumPorts(8)]).with_token(2),
            ]
        });
        let mut session = session(&mock);
        let reply = session.get(&[PropertyId::NumPorts]).await.unwrap();
        assert_eq!(reply.property(PropertyId::NumPorts), Some(&Property::NumPorts(8)));
        assert_eq!(session.token_id(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_as_connection_problem() {
        let mock = MockTransport::new();
        let mut session = session(&mock);
        let err = session.get(&[PropertyId::NumPorts]).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionProblem { .. }), "{err:?}");
        assert!(err.is_transient());
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn only_stale_replies_time_out() {
        let mock = MockTransport::respond_with(|req, _| {
            vec![MockReply::to(req, OpCode::GetReply, vec![]).with_sequence(req.sequence_id + 1)]
        });
        let err = session(&mock).with_sequence_id(10).get(&[]).await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
    }

    #[tokio::test]
    async fn garbage_reply_is_connection_problem() {
        let mock = MockTransport::respond_with(|_, _| vec![MockReply::Raw(vec![1, 2, 3])]);
        let err = session(&mock).get(&[PropertyId::NumPorts]).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionProblem { timed_out: false, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn login_fetches_token_then_authenticates() {
        let mock = MockTransport::respond_with(|req, _| {
            let op = if req.op_code == OpCode::Get {
                OpCode::GetReply
            } else {
                OpCode::LoginReply
            };
            vec![MockReply::to(req, op, vec![]).with_token(0x7777)]
        });
        let mut session = session(&mock);
        let reply = session.login("admin2", "password2").await.unwrap();
        assert_eq!(reply.header.op_code, OpCode::LoginReply);

        let sent = mock.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0.op_code, OpCode::Get);
        assert_eq!(sent[0].1, vec![Property::Query(PropertyId::GetTokenId)]);
        assert_eq!(sent[1].0.op_code, OpCode::Login);
        assert_eq!(sent[1].0.token_id, 0x7777);
        assert_eq!(
            sent[1].1,
            vec![
                Property::Username("admin2".into()),
                Property::Password("password2".into()),
            ]
        );
    }

    #[tokio::test]
    async fn set_reauthenticates_with_extra_properties() {
        let mock = MockTransport::respond_with(|req, _| {
            vec![MockReply::to(req, OpCode::GetReply, vec![]).with_token(9)]
        });
        let mut session = session(&mock);
        session
            .set("admin", "secret", vec![Property::VlanEnabled(true)])
            .await
            .unwrap();
        session
            .set("admin", "secret", vec![Property::Dhcp(false)])
            .await
            .unwrap();

        let sent = mock.sent();
        let ops: Vec<OpCode> = sent.iter().map(|(h, _)| h.op_code).collect();
        assert_eq!(ops, [OpCode::Get, OpCode::Login, OpCode::Get, OpCode::Login]);
        assert_eq!(
            sent[3].1,
            vec![
                Property::Username("admin".into()),
                Property::Password("secret".into()),
                Property::Dhcp(false),
            ]
        );
    }

    #[tokio::test]
    async fn device_errors_are_returned_not_raised() {
        let mock = MockTransport::respond_with(|req, _| {
            vec![MockReply::to(req, OpCode::LoginReply, vec![]).with_error(5)]
        });
        let reply = session(&mock).login("admin", "wrong").await.unwrap();
        assert!(!reply.is_success());
        assert_eq!(reply.header.error_code, 5);
    }
}
