pub mod simulated;
pub mod traits;

pub use simulated::{AckMode, FrameLog, SimulatedNode, SimulatedNodeConfig};
pub use traits::{TransmitRequest, TransmitStatus, Transport, TransportEvent};
