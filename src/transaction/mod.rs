//! Outstanding requests awaiting correlation

mod table;

pub use table::{Admission, FrameOutcome, TransactionTable, TransmitOutcome};

use std::time::Duration;

use bytes::Bytes;
use cc_protocol::{Command, CommandClassId};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::endpoint::EndpointAddress;
use crate::error::ApiError;

/// What an outstanding request holds on to until it ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Waiting for this response command. `selector` is the class-specific
    /// part the answer must carry, e.g. the color of a Get.
    Answer { response: u8, selector: Option<u8> },
    /// Needs no answer; its own transmit report ends it
    Transmit(u8),
}

/// Identifies an outstanding request. Requests that expect the same answer
/// from the same endpoint share a key and run one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub address: EndpointAddress,
    pub class: CommandClassId,
    pub slot: Slot,
}

impl TransactionKey {
    /// Key of a request the device must answer. `None` for requests that
    /// only need to be acknowledged.
    pub fn answer(address: EndpointAddress, command: &Command) -> Option<Self> {
        let response = command.expected_response()?;
        Some(Self {
            address,
            class: command.class(),
            slot: Slot::Answer {
                response,
                selector: command.correlation_key(),
            },
        })
    }

    /// Key of an acknowledge-only request, unique through its callback id
    pub fn transmit(address: EndpointAddress, class: CommandClassId, callback_id: u8) -> Self {
        Self {
            address,
            class,
            slot: Slot::Transmit(callback_id),
        }
    }
}

/// A command on its way to the link, not yet holding a callback id
#[derive(Debug)]
pub struct Request {
    pub address: EndpointAddress,
    pub command: Command,
    /// The frame encoded at the endpoint's negotiated version
    pub frame: Bytes,
    pub timeout: Duration,
    pub responder: Responder,
}

/// How a transaction ended successfully
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The device answered with this command
    Response(Command),
    /// The device acknowledged a command that expects no answer
    Acknowledged,
}

pub type Responder = oneshot::Sender<Result<Resolution, ApiError>>;

/// Tracks a sent command awaiting its answer
#[derive(Debug)]
pub struct PendingTransaction {
    pub key: TransactionKey,
    pub callback_id: u8,
    pub command: Command,
    pub deadline: Instant,
    /// Set once the link acknowledged the transmission
    pub confirmed: bool,
    responder: Responder,
}

impl PendingTransaction {
    pub fn new(
        key: TransactionKey,
        callback_id: u8,
        command: Command,
        deadline: Instant,
        responder: Responder,
    ) -> Self {
        Self {
            key,
            callback_id,
            command,
            deadline,
            confirmed: false,
            responder,
        }
    }

    /// Whether the device must answer with a command
    pub fn awaits_response(&self) -> bool {
        self.command.expected_response().is_some()
    }

    pub fn is_timed_out(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// The caller stopped waiting
    pub fn is_abandoned(&self) -> bool {
        self.responder.is_closed()
    }

    pub fn resolve(self, result: Result<Resolution, ApiError>) {
        // The caller may have gone away; nothing to do then
        let _ = self.responder.send(result);
    }
}
