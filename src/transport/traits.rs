//! Transport trait abstraction for pluggable device links

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::endpoint::EndpointAddress;

/// A frame handed to the transport for delivery
#[derive(Debug, Clone)]
pub struct TransmitRequest {
    /// Echoed back in the matching [`TransportEvent::TransmitReport`]
    pub callback_id: u8,
    pub address: EndpointAddress,
    /// Class id byte followed by the command body
    pub frame: Bytes,
}

/// Outcome of one transmission as reported by the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitStatus {
    /// The device acknowledged reception
    Ok,
    /// Sent, but the device never acknowledged it
    NoAck,
    /// The link could not send the frame
    Failed,
}

impl TransmitStatus {
    pub fn is_positive(self) -> bool {
        self == TransmitStatus::Ok
    }
}

/// Events delivered by a transport to the driver
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Result of a previous [`TransmitRequest`]
    TransmitReport { callback_id: u8, status: TransmitStatus },
    /// A frame received from a device
    Frame { address: EndpointAddress, frame: Bytes },
}

/// Link to the devices.
///
/// Inbound traffic does not go through this trait: a transport is created
/// together with the receiver of its [`TransportEvent`]s.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Queue a frame for delivery. Completion is reported asynchronously.
    async fn transmit(&self, request: TransmitRequest) -> Result<()>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
