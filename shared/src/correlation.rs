//! Response correlation
//!
//! Decides whether an inbound command answers an outstanding request.

use crate::codec::Command;

/// Outcome of comparing an inbound command with a sent one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The inbound command is the answer to the request
    Final,
    /// The device acknowledged the transmission but has not answered yet
    Confirmation,
    /// Unrelated traffic
    Unexpected,
}

/// Class-specific matcher: `(sent, received, positive_transmit)`
pub type CorrelationPredicate = fn(&Command, &Command, bool) -> Classification;

/// The rule used when a class has no predicate of its own: the request is
/// answered by the response command it declares, from the same class.
pub fn default_predicate(
    sent: &Command,
    received: &Command,
    positive_transmit: bool,
) -> Classification {
    let answers = sent.class() == received.class()
        && sent.expected_response() == Some(received.command_id());
    if answers {
        Classification::Final
    } else {
        fallback(positive_transmit)
    }
}

/// What a non-matching command amounts to
pub fn fallback(positive_transmit: bool) -> Classification {
    if positive_transmit {
        Classification::Confirmation
    } else {
        Classification::Unexpected
    }
}
