//! Driver configuration

use std::time::Duration;

/// Configuration for the driver event loop
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// How long a request may wait for its final answer
    pub response_timeout: Duration,
    /// Capacity of the request channel into the event loop
    pub request_queue_capacity: usize,
    /// Capacity of the transport event channel
    pub event_queue_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(10),
            request_queue_capacity: 100,
            event_queue_capacity: 100,
        }
    }
}
