//! Basic operations

use std::sync::Arc;

use cc_protocol::cc::basic::{self, BasicCommand};
use cc_protocol::{Command, CommandClassId, Duration, Value};

use super::ensure_supported;
use crate::driver::DriverHandle;
use crate::endpoint::Endpoint;
use crate::error::ApiError;
use crate::transaction::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicState {
    pub current_value: u8,
    /// Unknown below version 2
    pub target_value: Option<u8>,
    pub duration: Option<Duration>,
}

pub struct BasicApi {
    driver: DriverHandle,
    endpoint: Arc<Endpoint>,
}

impl BasicApi {
    pub fn new(driver: DriverHandle, endpoint: Arc<Endpoint>) -> Self {
        Self { driver, endpoint }
    }

    pub async fn get(&self) -> Result<BasicState, ApiError> {
        ensure_supported(&self.endpoint, CommandClassId::Basic, basic::GET)?;

        let resolution = self
            .driver
            .send_command(&self.endpoint, Command::Basic(BasicCommand::Get))
            .await?;
        match resolution {
            Resolution::Response(Command::Basic(BasicCommand::Report {
                current_value,
                target_value,
                duration,
            })) => Ok(BasicState {
                current_value,
                target_value,
                duration,
            }),
            other => Err(ApiError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    pub async fn set(&self, target_value: i64) -> Result<(), ApiError> {
        ensure_supported(&self.endpoint, CommandClassId::Basic, basic::SET)?;

        self.driver
            .send_command(&self.endpoint, Command::Basic(BasicCommand::Set { target_value }))
            .await
            .map(|_| ())
    }

    /// Write `targetValue`, then read the value back
    pub async fn set_value(
        &self,
        property: &str,
        property_key: Option<&str>,
        value: Value,
    ) -> Result<(), ApiError> {
        if property != basic::PROPERTY_TARGET {
            return Err(ApiError::invalid(format!(
                "Basic property {:?} is not writeable",
                property
            )));
        }
        if let Some(key) = property_key {
            return Err(ApiError::invalid(format!(
                "{} takes no property key, got {:?}",
                basic::PROPERTY_TARGET,
                key
            )));
        }
        let target = value.as_number().ok_or_else(|| {
            ApiError::invalid(format!(
                "{} expects a number, got {}",
                basic::PROPERTY_TARGET,
                value.type_name()
            ))
        })?;

        self.set(target).await?;
        self.get().await?;
        Ok(())
    }
}
