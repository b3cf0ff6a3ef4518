//! Capability API: one async operation per device action
//!
//! Every operation checks that the endpoint supports the command, validates
//! its arguments, then hands the command to the driver and maps the answer.
//! Nothing is transmitted when either check fails.

mod basic;
mod color_switch;

pub use basic::{BasicApi, BasicState};
pub use color_switch::{ColorState, ColorSwitchApi, LevelChangeOptions};

use std::sync::Arc;

use cc_protocol::{CommandClassId, Value, ValueId};

use crate::driver::DriverHandle;
use crate::endpoint::Endpoint;
use crate::error::ApiError;

fn ensure_supported(endpoint: &Endpoint, class: CommandClassId, command: u8) -> Result<(), ApiError> {
    if endpoint.supports_command(class, command) {
        Ok(())
    } else {
        Err(ApiError::CommandNotSupported {
            endpoint: endpoint.address(),
            class,
            command,
        })
    }
}

/// Write a named value, routing it to the operation of its command class.
///
/// A successful write is followed by a Get for the same value so the cache
/// reflects what the device actually applied.
pub async fn set_value(
    driver: &DriverHandle,
    endpoint: &Arc<Endpoint>,
    id: &ValueId,
    value: Value,
) -> Result<(), ApiError> {
    if id.endpoint != endpoint.address().index {
        return Err(ApiError::invalid(format!(
            "{} addresses endpoint {}, not {}",
            id,
            id.endpoint,
            endpoint.address()
        )));
    }

    let key = id.property_key.as_deref();
    match id.command_class {
        CommandClassId::ColorSwitch => {
            ColorSwitchApi::new(driver.clone(), endpoint.clone())
                .set_value(&id.property, key, value)
                .await
        }
        CommandClassId::Basic => {
            BasicApi::new(driver.clone(), endpoint.clone())
                .set_value(&id.property, key, value)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::driver::Driver;
    use crate::transport::{SimulatedNode, SimulatedNodeConfig};
    use cc_protocol::cc::{basic, color_switch};
    use cc_protocol::cc::color_switch::ColorComponent;

    fn start() -> (DriverHandle, Arc<Endpoint>) {
        let node_config = SimulatedNodeConfig::default();
        let endpoint = node_config.describe_endpoint();
        let (node, events) = SimulatedNode::new(node_config, 32);
        let driver = Driver::start(DriverConfig::default(), node, events);
        let endpoint = driver.add_endpoint(endpoint);
        (driver, endpoint)
    }

    #[tokio::test]
    async fn test_set_value_routes_by_class() {
        let (driver, endpoint) = start();

        let color = color_switch::target_value_id(0, ColorComponent::Green);
        set_value(&driver, &endpoint, &color, Value::Number(77))
            .await
            .expect("color set failed");
        assert_eq!(
            driver
                .cache()
                .get(2, &color_switch::current_value_id(0, ColorComponent::Green)),
            Some(Value::Number(77))
        );

        let level = basic::target_value_id(0);
        set_value(&driver, &endpoint, &level, Value::Number(40))
            .await
            .expect("basic set failed");
        assert_eq!(
            driver.cache().get(2, &basic::current_value_id(0)),
            Some(Value::Number(40))
        );
    }

    #[tokio::test]
    async fn test_set_value_rejects_wrong_endpoint() {
        let (driver, endpoint) = start();
        let other = color_switch::target_value_id(3, ColorComponent::Red);
        let err = set_value(&driver, &endpoint, &other, Value::Number(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }
}
