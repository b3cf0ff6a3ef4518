//! Command-class driver
//!
//! Sends Basic and Color Switch commands to endpoints over a [`Transport`],
//! correlates acknowledgements and responses with the requests that caused
//! them, caches reported values and runs capability interviews.

pub mod api;
pub mod cache;
pub mod config;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod interview;
pub mod transaction;
pub mod transport;

pub use api::{set_value, BasicApi, ColorSwitchApi};
pub use cache::ValueCache;
pub use config::DriverConfig;
pub use driver::{Driver, DriverHandle};
pub use endpoint::{Endpoint, EndpointAddress};
pub use error::{ApiError, InterviewError};
pub use interview::{InterviewReport, Orchestrator};
pub use transaction::Resolution;
pub use transport::Transport;
