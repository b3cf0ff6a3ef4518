//! Color Switch operations

use std::sync::Arc;

use cc_protocol::cc::color_switch::{
    self, ColorComponent, ColorSwitchCommand, ColorTable, LevelChangeDirection, SupportedColors,
};
use cc_protocol::{Command, CommandClassId, Duration, Value};
use tracing::debug;

use super::ensure_supported;
use crate::driver::DriverHandle;
use crate::endpoint::Endpoint;
use crate::error::ApiError;
use crate::transaction::Resolution;

/// Duration used by [`ColorSwitchApi::set`] when the caller gives none
pub const DEFAULT_SET_DURATION_SECS: u32 = 1;

/// State of one color channel as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorState {
    pub current_value: u8,
    /// Unknown below version 3
    pub target_value: Option<u8>,
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LevelChangeOptions {
    pub direction: LevelChangeDirection,
    /// Start from this level instead of the current one
    pub start_level: Option<u8>,
    /// Device default when `None`
    pub duration: Option<Duration>,
}

pub struct ColorSwitchApi {
    driver: DriverHandle,
    endpoint: Arc<Endpoint>,
}

impl ColorSwitchApi {
    pub fn new(driver: DriverHandle, endpoint: Arc<Endpoint>) -> Self {
        Self { driver, endpoint }
    }

    fn ensure_supported(&self, command: u8) -> Result<(), ApiError> {
        ensure_supported(&self.endpoint, CommandClassId::ColorSwitch, command)
    }

    async fn send(&self, command: ColorSwitchCommand) -> Result<Resolution, ApiError> {
        self.driver
            .send_command(&self.endpoint, Command::ColorSwitch(command))
            .await
    }

    /// Ask which color channels the endpoint supports
    pub async fn get_supported(&self) -> Result<SupportedColors, ApiError> {
        self.ensure_supported(color_switch::SUPPORTED_GET)?;

        match self.send(ColorSwitchCommand::SupportedGet).await? {
            Resolution::Response(Command::ColorSwitch(ColorSwitchCommand::SupportedReport {
                supported,
            })) => Ok(supported),
            other => Err(ApiError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Read one channel
    pub async fn get(&self, component: ColorComponent) -> Result<ColorState, ApiError> {
        self.ensure_supported(color_switch::GET)?;

        match self.send(ColorSwitchCommand::Get { component }).await? {
            Resolution::Response(Command::ColorSwitch(ColorSwitchCommand::Report {
                current_value,
                target_value,
                duration,
                ..
            })) => Ok(ColorState {
                current_value,
                target_value,
                duration,
            }),
            other => Err(ApiError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Set one or more channels. Channels missing from `colors` are left
    /// alone by the device.
    pub async fn set(&self, colors: ColorTable, duration: Option<Duration>) -> Result<(), ApiError> {
        self.ensure_supported(color_switch::SET)?;
        if colors.is_empty() {
            return Err(ApiError::invalid("a color set needs at least one channel"));
        }

        let duration = duration.unwrap_or_else(|| Duration::seconds(DEFAULT_SET_DURATION_SECS));
        self.send(ColorSwitchCommand::Set { colors, duration })
            .await
            .map(|_| ())
    }

    pub async fn start_level_change(
        &self,
        component: ColorComponent,
        options: LevelChangeOptions,
    ) -> Result<(), ApiError> {
        self.ensure_supported(color_switch::START_LEVEL_CHANGE)?;

        self.send(ColorSwitchCommand::StartLevelChange {
            component,
            direction: options.direction,
            start_level: options.start_level,
            duration: options.duration.unwrap_or_default(),
        })
        .await
        .map(|_| ())
    }

    pub async fn stop_level_change(&self, component: ColorComponent) -> Result<(), ApiError> {
        self.ensure_supported(color_switch::STOP_LEVEL_CHANGE)?;

        self.send(ColorSwitchCommand::StopLevelChange { component })
            .await
            .map(|_| ())
    }

    /// Write `targetColor` for one channel, then read the channel back
    pub async fn set_value(
        &self,
        property: &str,
        property_key: Option<&str>,
        value: Value,
    ) -> Result<(), ApiError> {
        if property != color_switch::PROPERTY_TARGET {
            return Err(ApiError::invalid(format!(
                "Color Switch property {:?} is not writeable",
                property
            )));
        }
        let key = property_key.ok_or_else(|| {
            ApiError::invalid(format!("{} needs a color key", color_switch::PROPERTY_TARGET))
        })?;
        let component = ColorComponent::from_key(key)
            .ok_or_else(|| ApiError::invalid(format!("unknown color key {:?}", key)))?;
        let level = value.as_number().ok_or_else(|| {
            ApiError::invalid(format!(
                "{} expects a number, got {}",
                key,
                value.type_name()
            ))
        })?;

        self.set(ColorTable::new().with(component, level), None).await?;
        debug!("{} set to {}, refreshing", component, level);
        self.get(component).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::driver::Driver;
    use crate::transport::{FrameLog, SimulatedNode, SimulatedNodeConfig};

    fn start(node_config: SimulatedNodeConfig) -> (ColorSwitchApi, DriverHandle, FrameLog) {
        let endpoint = node_config.describe_endpoint();
        start_with(node_config, endpoint)
    }

    fn start_with(
        node_config: SimulatedNodeConfig,
        endpoint: Endpoint,
    ) -> (ColorSwitchApi, DriverHandle, FrameLog) {
        let (node, events) = SimulatedNode::new(node_config, 32);
        let log = node.frame_log();
        let driver = Driver::start(DriverConfig::default(), node, events);
        let endpoint = driver.add_endpoint(endpoint);
        (ColorSwitchApi::new(driver.clone(), endpoint), driver, log)
    }

    #[tokio::test]
    async fn test_get_supported() {
        let (api, driver, _log) = start(SimulatedNodeConfig::default());
        let supported = api.get_supported().await.expect("get supported failed");
        assert!(supported.supports(ColorComponent::Red));
        assert!(!supported.supports(ColorComponent::Amber));

        let flag = driver
            .cache()
            .get(2, &color_switch::supported_value_id(0, ColorComponent::Amber));
        assert_eq!(flag, Some(Value::Bool(false)));
    }

    #[tokio::test]
    async fn test_set_then_get_updates_cache() {
        let (api, driver, _log) = start(SimulatedNodeConfig::default());

        api.set(ColorTable::new().with(ColorComponent::Red, 10), None)
            .await
            .expect("set failed");
        let state = api.get(ColorComponent::Red).await.expect("get failed");
        assert_eq!(state.current_value, 10);
        assert_eq!(state.target_value, Some(10));

        let current = driver
            .cache()
            .get(2, &color_switch::current_value_id(0, ColorComponent::Red));
        assert_eq!(current, Some(Value::Number(10)));
    }

    #[tokio::test]
    async fn test_sets_on_different_channels_run_together() {
        let (api, _driver, _log) = start(SimulatedNodeConfig::default());

        let (red, green) = tokio::join!(
            api.set(ColorTable::new().with(ColorComponent::Red, 10), None),
            api.set(ColorTable::new().with(ColorComponent::Green, 20), None),
        );
        red.expect("red set failed");
        green.expect("green set failed");

        let (supported, blue) = tokio::join!(
            api.get_supported(),
            api.set(ColorTable::new().with(ColorComponent::Blue, 5), None),
        );
        assert!(supported.expect("get supported failed").supports(ColorComponent::Blue));
        blue.expect("blue set failed");

        let (red, green) = tokio::join!(api.get(ColorComponent::Red), api.get(ColorComponent::Green));
        assert_eq!(red.expect("red get failed").current_value, 10);
        assert_eq!(green.expect("green get failed").current_value, 20);
    }

    #[tokio::test]
    async fn test_set_uses_default_duration() {
        let (api, _driver, log) = start(SimulatedNodeConfig::default());
        api.set(ColorTable::new().with(ColorComponent::Blue, 300), None)
            .await
            .expect("set failed");
        let frames = log.frames().await;
        assert_eq!(&frames[0][..], &[0x33, 0x05, 0x01, 0x04, 0xFF, 0x01]);
    }

    #[tokio::test]
    async fn test_report_below_v3_has_unknown_target() {
        let (api, _driver, _log) = start(SimulatedNodeConfig {
            color_switch_version: 2,
            ..Default::default()
        });
        let state = api.get(ColorComponent::Green).await.expect("get failed");
        assert_eq!(state.target_value, None);
        assert_eq!(state.duration, None);
    }

    #[tokio::test]
    async fn test_unsupported_command_sends_nothing() {
        let node_config = SimulatedNodeConfig::default();
        let endpoint = node_config
            .describe_endpoint()
            .with_supported_commands(CommandClassId::ColorSwitch, [color_switch::GET]);
        let (api, _driver, log) = start_with(node_config, endpoint);

        let err = api
            .start_level_change(ColorComponent::Red, LevelChangeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::CommandNotSupported {
                command: color_switch::START_LEVEL_CHANGE,
                ..
            }
        ));
        assert_eq!(log.count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_send_nothing() {
        let (api, _driver, log) = start(SimulatedNodeConfig::default());

        let err = api.set(ColorTable::new(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        let err = api
            .set_value("targetColor", Some("ultraviolet"), Value::Number(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        let err = api
            .set_value("targetColor", Some("red"), Value::Bool(true))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expects a number, got boolean"));

        let err = api
            .set_value("targetColor", None, Value::Number(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        let err = api
            .set_value("currentColor", Some("red"), Value::Number(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        assert_eq!(log.count().await, 0);
    }

    #[tokio::test]
    async fn test_set_value_refreshes() {
        let (api, driver, log) = start(SimulatedNodeConfig::default());
        api.set_value("targetColor", Some("warmWhite"), Value::Number(128))
            .await
            .expect("set value failed");

        let frames = log.frames().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[1][..], &[0x33, 0x03, 0x00]);
        assert_eq!(
            driver
                .cache()
                .get(2, &color_switch::target_value_id(0, ColorComponent::WarmWhite)),
            Some(Value::Number(128))
        );
    }

    #[tokio::test]
    async fn test_level_change_round_trip() {
        let (api, _driver, log) = start(SimulatedNodeConfig::default());
        api.start_level_change(
            ColorComponent::Red,
            LevelChangeOptions {
                direction: LevelChangeDirection::Up,
                start_level: Some(5),
                duration: None,
            },
        )
        .await
        .expect("start failed");
        api.stop_level_change(ColorComponent::Red)
            .await
            .expect("stop failed");

        let frames = log.frames().await;
        assert_eq!(&frames[0][..], &[0x33, 0x06, 0x00, 0x02, 0x05, 0xFF]);
        assert_eq!(&frames[1][..], &[0x33, 0x07, 0x02]);
        assert_eq!(api.get(ColorComponent::Red).await.expect("get failed").current_value, 0xFF);
    }
}
