//! Pending transaction table

use std::collections::{HashMap, VecDeque};

use cc_protocol::{Classification, Command, Registry};
use tokio::time::Instant;

use super::{PendingTransaction, Request, Resolution, TransactionKey};
use crate::endpoint::EndpointAddress;
use crate::error::ApiError;
use crate::transport::{TransmitRequest, TransmitStatus};

/// What happened to a request offered to the table
#[derive(Debug)]
pub enum Admission {
    /// Registered; the frame must be transmitted now
    Started(TransactionKey, TransmitRequest),
    /// Waiting behind the pending request with the same key
    Queued(TransactionKey),
    /// Failed right away; the caller has been told
    Rejected,
}

/// What a transmit report did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitOutcome {
    /// No transaction uses this callback id
    Unknown,
    /// The transmission failed and the transaction was failed with it
    Failed(TransactionKey),
    /// The command needed no answer and is done
    Completed(TransactionKey),
    /// Acknowledged; still waiting for the answer
    Confirmed(TransactionKey),
}

/// What an inbound command did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Resolved(TransactionKey),
    Unmatched(Classification),
}

/// Pending transactions by key, a callback-id index for transmit reports,
/// and the requests waiting for a busy key
#[derive(Debug)]
pub struct TransactionTable {
    by_key: HashMap<TransactionKey, PendingTransaction>,
    by_callback: HashMap<u8, TransactionKey>,
    waiting: HashMap<TransactionKey, VecDeque<Request>>,
    next_callback: u8,
}

impl Default for TransactionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionTable {
    pub fn new() -> Self {
        Self {
            by_key: HashMap::new(),
            by_callback: HashMap::new(),
            waiting: HashMap::new(),
            next_callback: 1,
        }
    }

    /// Number of pending transactions
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Number of requests waiting for their key
    pub fn queued(&self) -> usize {
        self.waiting.values().map(VecDeque::len).sum()
    }

    /// Allocate a callback id not used by any pending transaction.
    /// Ids run 1..=255 and wrap; 0 is never handed out.
    fn next_callback_id(&mut self) -> Option<u8> {
        for _ in 0..u8::MAX {
            let id = self.next_callback;
            self.next_callback = if id == u8::MAX { 1 } else { id + 1 };
            if !self.by_callback.contains_key(&id) {
                return Some(id);
            }
        }
        None
    }

    /// Start a request, or queue it behind the pending one that expects the
    /// same answer from the same endpoint.
    pub fn admit(&mut self, request: Request, now: Instant) -> Admission {
        if let Some(key) = TransactionKey::answer(request.address, &request.command) {
            if self.by_key.contains_key(&key) {
                self.waiting.entry(key).or_default().push_back(request);
                return Admission::Queued(key);
            }
        }
        self.start(request, now)
    }

    fn start(&mut self, request: Request, now: Instant) -> Admission {
        let Some(callback_id) = self.next_callback_id() else {
            let _ = request
                .responder
                .send(Err(ApiError::Transport("no free callback id".into())));
            return Admission::Rejected;
        };

        let Request {
            address,
            command,
            frame,
            timeout,
            responder,
        } = request;
        let key = TransactionKey::answer(address, &command)
            .unwrap_or_else(|| TransactionKey::transmit(address, command.class(), callback_id));

        self.by_callback.insert(callback_id, key);
        self.by_key.insert(
            key,
            PendingTransaction::new(key, callback_id, command, now + timeout, responder),
        );

        Admission::Started(
            key,
            TransmitRequest {
                callback_id,
                address,
                frame,
            },
        )
    }

    /// Start the next queued request whose key has come free. Requests whose
    /// caller went away while waiting are dropped.
    pub fn next_ready(&mut self, now: Instant) -> Option<(TransactionKey, TransmitRequest)> {
        loop {
            let key = self
                .waiting
                .keys()
                .find(|key| !self.by_key.contains_key(key))
                .copied()?;

            let request = self.waiting.get_mut(&key).and_then(VecDeque::pop_front);
            if self.waiting.get(&key).map_or(true, VecDeque::is_empty) {
                self.waiting.remove(&key);
            }

            let Some(request) = request else { continue };
            if request.responder.is_closed() {
                continue;
            }
            if let Admission::Started(key, transmit) = self.start(request, now) {
                return Some((key, transmit));
            }
        }
    }

    fn remove(&mut self, key: &TransactionKey) -> Option<PendingTransaction> {
        let pending = self.by_key.remove(key)?;
        // A confirmed transaction's id may already belong to another one
        if self.by_callback.get(&pending.callback_id) == Some(key) {
            self.by_callback.remove(&pending.callback_id);
        }
        Some(pending)
    }

    /// Fail one transaction. Returns whether it was pending.
    pub fn fail(&mut self, key: &TransactionKey, error: ApiError) -> bool {
        match self.remove(key) {
            Some(pending) => {
                pending.resolve(Err(error));
                true
            }
            None => false,
        }
    }

    /// Apply a transmit report from the link
    pub fn handle_transmit(&mut self, callback_id: u8, status: TransmitStatus) -> TransmitOutcome {
        let Some(key) = self.by_callback.get(&callback_id).copied() else {
            return TransmitOutcome::Unknown;
        };

        if !status.is_positive() {
            self.fail(&key, ApiError::TransmitFailed(status));
            return TransmitOutcome::Failed(key);
        }

        let awaits_response = self
            .by_key
            .get(&key)
            .map(|p| p.awaits_response())
            .unwrap_or(false);

        if awaits_response {
            if let Some(pending) = self.by_key.get_mut(&key) {
                pending.confirmed = true;
            }
            // The callback id is spent; the answer is matched by content
            self.by_callback.remove(&callback_id);
            TransmitOutcome::Confirmed(key)
        } else {
            if let Some(pending) = self.remove(&key) {
                pending.resolve(Ok(Resolution::Acknowledged));
            }
            TransmitOutcome::Completed(key)
        }
    }

    /// Offer an inbound command to the transactions pending on its endpoint.
    /// The first one it answers is resolved with it.
    pub fn handle_frame(
        &mut self,
        address: EndpointAddress,
        received: &Command,
        registry: &Registry,
    ) -> FrameOutcome {
        let matched = self
            .by_key
            .values()
            .filter(|p| p.key.address == address)
            .find(|p| registry.classify(&p.command, received, false) == Classification::Final)
            .map(|p| p.key);

        match matched.and_then(|key| self.remove(&key)) {
            Some(pending) => {
                let key = pending.key;
                pending.resolve(Ok(Resolution::Response(received.clone())));
                FrameOutcome::Resolved(key)
            }
            None => FrameOutcome::Unmatched(Classification::Unexpected),
        }
    }

    /// Earliest deadline among pending transactions
    pub fn next_deadline(&self) -> Option<Instant> {
        self.by_key.values().map(|p| p.deadline).min()
    }

    /// Fail every transaction whose deadline has passed, and drop those whose
    /// caller stopped waiting. Returns the keys that timed out.
    pub fn expire(&mut self, now: Instant) -> Vec<TransactionKey> {
        let abandoned: Vec<TransactionKey> = self
            .by_key
            .values()
            .filter(|p| p.is_abandoned())
            .map(|p| p.key)
            .collect();
        for key in &abandoned {
            self.remove(key);
        }

        let timed_out: Vec<TransactionKey> = self
            .by_key
            .values()
            .filter(|p| p.is_timed_out(now))
            .map(|p| p.key)
            .collect();

        for key in &timed_out {
            if let Some(pending) = self.remove(key) {
                let err = ApiError::ResponseTimeout {
                    class: pending.command.class(),
                    command: pending.command.command_id(),
                };
                pending.resolve(Err(err));
            }
        }

        timed_out
    }

    /// Fail every pending and queued request with `Cancelled`. Returns how
    /// many there were.
    pub fn cancel_all(&mut self) -> usize {
        let mut count = self.by_key.len();
        self.by_callback.clear();
        for (_, pending) in self.by_key.drain() {
            pending.resolve(Err(ApiError::Cancelled));
        }
        for (_, queue) in self.waiting.drain() {
            for request in queue {
                count += 1;
                let _ = request.responder.send(Err(ApiError::Cancelled));
            }
        }
        count
    }
}
