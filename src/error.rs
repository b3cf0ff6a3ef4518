//! Errors surfaced to API and interview callers

use cc_protocol::{CommandClassId, EncodeError};
use thiserror::Error;

use crate::endpoint::EndpointAddress;
use crate::transport::TransmitStatus;

/// Failure of a capability API operation
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{class} command 0x{command:02X} is not supported by {endpoint}")]
    CommandNotSupported {
        endpoint: EndpointAddress,
        class: CommandClassId,
        command: u8,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No response to {class} command 0x{command:02X} before the deadline")]
    ResponseTimeout { class: CommandClassId, command: u8 },

    #[error("Request cancelled: driver shut down")]
    Cancelled,

    #[error("Transmission failed: {0:?}")]
    TransmitFailed(TransmitStatus),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArgument(msg.into())
    }
}

/// Failure of one class interview on one endpoint
#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("{class} interview of {endpoint} aborted: {source}")]
    Api {
        endpoint: EndpointAddress,
        class: CommandClassId,
        #[source]
        source: ApiError,
    },

    #[error("{endpoint} does not implement {class}")]
    ClassNotImplemented {
        endpoint: EndpointAddress,
        class: CommandClassId,
    },

    #[error("{class} interview of {endpoint} is already running")]
    AlreadyRunning {
        endpoint: EndpointAddress,
        class: CommandClassId,
    },
}
