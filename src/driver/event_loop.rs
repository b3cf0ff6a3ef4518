//! The driver's single event loop

use std::sync::Arc;

use cc_protocol::codec::split_frame;
use cc_protocol::{CommandClassId, Registry};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::{DriverRequest, EndpointMap};
use crate::cache::ValueCache;
use crate::endpoint::EndpointAddress;
use crate::error::ApiError;
use crate::transaction::{
    Admission, FrameOutcome, TransactionKey, TransactionTable, TransmitOutcome,
};
use crate::transport::{TransmitRequest, Transport, TransportEvent};

pub(super) async fn run<T: Transport>(
    transport: T,
    mut requests: mpsc::Receiver<DriverRequest>,
    mut events: mpsc::Receiver<TransportEvent>,
    cache: Arc<ValueCache>,
    endpoints: EndpointMap,
) {
    let registry = Registry::standard();
    let mut table = TransactionTable::new();

    info!("Driver started on {} transport", transport.name());

    loop {
        start_ready(&transport, &mut table).await;
        let deadline = table.next_deadline();

        tokio::select! {
            request = requests.recv() => match request {
                Some(DriverRequest::Send(request)) => {
                    match table.admit(request, Instant::now()) {
                        Admission::Started(key, transmit) => {
                            send(&transport, &mut table, key, transmit).await;
                        }
                        Admission::Queued(key) => {
                            debug!(
                                "{} request to {} waits for the pending one ({} queued)",
                                key.class,
                                key.address,
                                table.queued()
                            );
                        }
                        Admission::Rejected => {}
                    }
                }
                Some(DriverRequest::Shutdown { done }) => {
                    let cancelled = table.cancel_all();
                    info!("Driver shutting down, cancelled {} pending transactions", cancelled);
                    let _ = done.send(cancelled);
                    break;
                }
                None => {
                    table.cancel_all();
                    debug!("All driver handles dropped");
                    break;
                }
            },

            event = events.recv() => match event {
                Some(TransportEvent::TransmitReport { callback_id, status }) => {
                    match table.handle_transmit(callback_id, status) {
                        TransmitOutcome::Unknown => {
                            debug!("Transmit report for unknown callback {}", callback_id);
                        }
                        TransmitOutcome::Failed(key) => {
                            warn!("Transmission to {} failed: {:?}", key.address, status);
                        }
                        TransmitOutcome::Completed(key) => {
                            debug!("{} command to {} acknowledged", key.class, key.address);
                        }
                        TransmitOutcome::Confirmed(key) => {
                            debug!("{} request to {} confirmed, awaiting answer", key.class, key.address);
                        }
                    }
                }
                Some(TransportEvent::Frame { address, frame }) => {
                    handle_frame(address, &frame, registry, &endpoints, &cache, &mut table);
                }
                None => {
                    let cancelled = table.cancel_all();
                    warn!("Transport closed, cancelled {} pending transactions", cancelled);
                    break;
                }
            },

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                for key in table.expire(Instant::now()) {
                    debug!("{} request to {} timed out", key.class, key.address);
                }
            }
        }
    }
}

/// Send queued requests whose key has come free
async fn start_ready<T: Transport>(transport: &T, table: &mut TransactionTable) {
    while let Some((key, transmit)) = table.next_ready(Instant::now()) {
        send(transport, table, key, transmit).await;
    }
}

async fn send<T: Transport>(
    transport: &T,
    table: &mut TransactionTable,
    key: TransactionKey,
    transmit: TransmitRequest,
) {
    debug!("Transmitting to {} (callback {})", key.address, transmit.callback_id);
    if let Err(e) = transport.transmit(transmit).await {
        warn!("Transport rejected frame for {}: {}", key.address, e);
        table.fail(&key, ApiError::Transport(e.to_string()));
    }
}

/// Decode one inbound frame, apply its cache writes and offer it to the
/// pending transactions. Undecodable frames are dropped.
fn handle_frame(
    address: EndpointAddress,
    frame: &[u8],
    registry: &Registry,
    endpoints: &EndpointMap,
    cache: &ValueCache,
    table: &mut TransactionTable,
) {
    let raw = match split_frame(frame) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Dropping frame from {}: {}", address, e);
            return;
        }
    };

    let version = CommandClassId::try_from(raw.class)
        .ok()
        .and_then(|class| endpoints.get(&address).map(|e| e.version(class)))
        .unwrap_or(1);

    let command = match registry.decode_raw(raw.class, raw.command, raw.payload, version) {
        Ok(command) => command,
        Err(e) => {
            warn!(
                "Dropping frame from {} (class 0x{:02X}, command 0x{:02X}): {}",
                address, raw.class, raw.command, e
            );
            return;
        }
    };

    cache.apply(address.node_id, command.value_updates(address.index));

    match table.handle_frame(address, &command, registry) {
        FrameOutcome::Resolved(key) => {
            debug!("{} request to {} answered", key.class, key.address);
        }
        FrameOutcome::Unmatched(classification) => {
            debug!(
                "{} command 0x{:02X} from {}: {:?}",
                command.class(),
                command.command_id(),
                address,
                classification
            );
        }
    }
}
