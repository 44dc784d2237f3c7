// Scripted in-memory transport.
//
// Each frame sent through `MockTransport` is decoded and handed to a
// responder closure, whose replies are queued for the following `recv`
// calls. When the queue is empty `recv` never resolves, so the caller's
// receive timeout fires just as it would against a silent switch.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::codec::{Header, OpCode, Property, encode_packet, parse_frame};
use crate::error::Error;
use crate::transport::Transport;

type Responder = Box<dyn FnMut(&Header, &[Property]) -> Vec<MockReply> + Send>;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A well-formed frame, encoded when it is received.
    Frame {
        header: Header,
        payload: Vec<Property>,
    },
    /// Bytes delivered verbatim.
    Raw(Vec<u8>),
}

impl MockReply {
    /// A reply echoing `request`'s header with a new op code.
    pub fn to(request: &Header, op_code: OpCode, payload: Vec<Property>) -> Self {
        Self::Frame {
            header: Header {
                op_code,
                ..*request
            },
            payload,
        }
    }

    pub fn with_token(self, token_id: u16) -> Self {
        self.map_header(|h| h.token_id = token_id)
    }

    pub fn with_error(self, error_code: u32) -> Self {
        self.map_header(|h| h.error_code = error_code)
    }

    pub fn with_sequence(self, sequence_id: u16) -> Self {
        self.map_header(|h| h.sequence_id = sequence_id)
    }

    fn map_header(mut self, f: impl FnOnce(&mut Header)) -> Self {
        if let Self::Frame { header, .. } = &mut self {
            f(header);
        }
        self
    }

    fn into_wire(self) -> Result<Vec<u8>, Error> {
        match self {
            Self::Frame { header, payload } => encode_packet(&header, &payload),
            Self::Raw(bytes) => Ok(bytes),
        }
    }
}

#[derive(Default)]
struct State {
    responder: Option<Responder>,
    pending: VecDeque<MockReply>,
    sent: Vec<(Header, Vec<Property>)>,
}

/// In-memory [`Transport`]. Clones share the same script and log.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("sent", &self.sent().len())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every decoded request with whatever `responder` returns.
    pub fn respond_with<F>(responder: F) -> Self
    where
        F: FnMut(&Header, &[Property]) -> Vec<MockReply> + Send + 'static,
    {
        let mock = Self::new();
        mock.lock().responder = Some(Box::new(responder));
        mock
    }

    /// Queue a reply regardless of what is sent.
    pub fn push_reply(&self, reply: MockReply) {
        self.lock().pending.push_back(reply);
    }

    /// Every request sent so far, decoded.
    pub fn sent(&self) -> Vec<(Header, Vec<Property>)> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    async fn send(&mut self, frame: &[u8]) -> Result<(), Error> {
        let (header, payload) = parse_frame(frame)?;
        let mut state = self.lock();
        let replies = match state.responder.as_mut() {
            Some(responder) => responder(&header, &payload),
            None => Vec::new(),
        };
        state.pending.extend(replies);
        state.sent.push((header, payload));
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, Error> {
        let next = self.lock().pending.pop_front();
        match next {
            Some(reply) => reply.into_wire(),
            None => {
                debug!("mock transport has no scripted reply; waiting forever");
                std::future::pending().await
            }
        }
    }
}
