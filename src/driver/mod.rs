//! Driver: owns the transport, the pending transaction table and the value
//! cache, and serializes all of it through one event loop.

mod event_loop;

use std::sync::Arc;

use cc_protocol::codec::encode_frame;
use cc_protocol::Command;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::cache::ValueCache;
use crate::config::DriverConfig;
use crate::endpoint::{Endpoint, EndpointAddress};
use crate::error::ApiError;
use crate::transaction::{Request, Resolution};
use crate::transport::{Transport, TransportEvent};

/// Known endpoints, shared between handles and the event loop
pub type EndpointMap = Arc<DashMap<EndpointAddress, Arc<Endpoint>>>;

/// Requests from handles to the event loop
#[derive(Debug)]
pub(crate) enum DriverRequest {
    Send(Request),
    Shutdown {
        done: oneshot::Sender<usize>,
    },
}

pub struct Driver;

impl Driver {
    /// Start the event loop over a transport and its event receiver
    pub fn start<T: Transport>(
        config: DriverConfig,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
    ) -> DriverHandle {
        let (request_tx, request_rx) = mpsc::channel(config.request_queue_capacity);
        let cache = Arc::new(ValueCache::new());
        let endpoints: EndpointMap = Arc::new(DashMap::new());

        let cache_clone = cache.clone();
        let endpoints_clone = endpoints.clone();
        tokio::spawn(async move {
            event_loop::run(transport, request_rx, events, cache_clone, endpoints_clone).await;
        });

        DriverHandle {
            config,
            request_tx,
            cache,
            endpoints,
        }
    }
}

/// Cheap, cloneable access to a running driver
#[derive(Clone)]
pub struct DriverHandle {
    config: DriverConfig,
    request_tx: mpsc::Sender<DriverRequest>,
    cache: Arc<ValueCache>,
    endpoints: EndpointMap,
}

impl DriverHandle {
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ValueCache> {
        &self.cache
    }

    /// Register an endpoint so its frames decode at its negotiated versions
    pub fn add_endpoint(&self, endpoint: Endpoint) -> Arc<Endpoint> {
        let endpoint = Arc::new(endpoint);
        self.endpoints.insert(endpoint.address(), endpoint.clone());
        endpoint
    }

    pub fn endpoint(&self, address: EndpointAddress) -> Option<Arc<Endpoint>> {
        self.endpoints.get(&address).map(|e| e.value().clone())
    }

    /// Send a command to an endpoint and wait until it is answered,
    /// acknowledged, failed or timed out.
    pub async fn send_command(
        &self,
        endpoint: &Endpoint,
        command: Command,
    ) -> Result<Resolution, ApiError> {
        let version = endpoint.version(command.class());
        let frame = encode_frame(&command, version)?;
        let (responder, response_rx) = oneshot::channel();

        debug!(
            "Submitting {} command 0x{:02X} to {} (v{})",
            command.class(),
            command.command_id(),
            endpoint.address(),
            version
        );

        self.request_tx
            .send(DriverRequest::Send(Request {
                address: endpoint.address(),
                command,
                frame,
                timeout: self.config.response_timeout,
                responder,
            }))
            .await
            .map_err(|_| ApiError::Cancelled)?;

        // A dropped responder means the loop went away without answering
        response_rx.await.map_err(|_| ApiError::Cancelled)?
    }

    /// Stop the event loop, failing every pending transaction with
    /// `Cancelled`. Returns how many were cancelled.
    pub async fn shutdown(&self) -> usize {
        let (done, done_rx) = oneshot::channel();
        if self
            .request_tx
            .send(DriverRequest::Shutdown { done })
            .await
            .is_err()
        {
            return 0;
        }
        done_rx.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{
        AckMode, SimulatedNode, SimulatedNodeConfig, TransmitRequest, TransmitStatus,
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use cc_protocol::cc::basic::BasicCommand;
    use cc_protocol::cc::color_switch::{self, ColorComponent, ColorSwitchCommand, ColorTable};
    use cc_protocol::{CommandClassId, Duration as CcDuration, Value};
    use std::time::Duration;

    fn start(node_config: SimulatedNodeConfig) -> (DriverHandle, Arc<Endpoint>) {
        let config = DriverConfig::default();
        let endpoint = node_config.describe_endpoint();
        let (node, events) = SimulatedNode::new(node_config, config.event_queue_capacity);
        let driver = Driver::start(config, node, events);
        let endpoint = driver.add_endpoint(endpoint);
        (driver, endpoint)
    }

    fn red_get() -> Command {
        ColorSwitchCommand::Get {
            component: ColorComponent::Red,
        }
        .into()
    }

    #[tokio::test]
    async fn test_get_resolves_with_report_and_updates_cache() {
        let (driver, endpoint) = start(SimulatedNodeConfig::default());

        let resolution = driver
            .send_command(&endpoint, red_get())
            .await
            .expect("get failed");
        assert!(matches!(
            resolution,
            Resolution::Response(Command::ColorSwitch(ColorSwitchCommand::Report {
                component: ColorComponent::Red,
                current_value: 0,
                ..
            }))
        ));

        let cached = driver
            .cache()
            .get(2, &color_switch::current_value_id(0, ColorComponent::Red));
        assert_eq!(cached, Some(Value::Number(0)));
    }

    #[tokio::test]
    async fn test_set_resolves_on_ack() {
        let (driver, endpoint) = start(SimulatedNodeConfig::default());
        let set: Command = ColorSwitchCommand::Set {
            colors: ColorTable::new().with(ColorComponent::Red, 10),
            duration: CcDuration::seconds(1),
        }
        .into();
        let resolution = driver.send_command(&endpoint, set).await.expect("set failed");
        assert_eq!(resolution, Resolution::Acknowledged);
    }

    #[tokio::test]
    async fn test_failed_transmission() {
        let (driver, endpoint) = start(SimulatedNodeConfig {
            ack_mode: AckMode::Fail,
            ..Default::default()
        });
        let err = driver
            .send_command(&endpoint, Command::Basic(BasicCommand::Get))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TransmitFailed(TransmitStatus::Failed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_times_out() {
        let (driver, endpoint) = start(SimulatedNodeConfig {
            respond: false,
            ..Default::default()
        });
        let started = tokio::time::Instant::now();
        let err = driver.send_command(&endpoint, red_get()).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::ResponseTimeout {
                class: CommandClassId::ColorSwitch,
                command: color_switch::GET
            }
        ));
        assert!(started.elapsed() >= driver.config().response_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending() {
        let (driver, endpoint) = start(SimulatedNodeConfig {
            respond: false,
            ..Default::default()
        });

        let pending = {
            let driver = driver.clone();
            let endpoint = endpoint.clone();
            tokio::spawn(async move { driver.send_command(&endpoint, red_get()).await })
        };
        // Let the request reach the loop and be acknowledged
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(driver.shutdown().await, 1);
        let result = pending.await.expect("task panicked");
        assert!(matches!(result, Err(ApiError::Cancelled)));

        // Requests after shutdown are cancelled right away
        let err = driver
            .send_command(&endpoint, Command::Basic(BasicCommand::Get))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
    }

    fn set(component: ColorComponent, level: i64) -> Command {
        ColorSwitchCommand::Set {
            colors: ColorTable::new().with(component, level),
            duration: CcDuration::seconds(1),
        }
        .into()
    }

    #[tokio::test]
    async fn test_concurrent_sets_on_different_channels() {
        let (driver, endpoint) = start(SimulatedNodeConfig::default());

        let (red, green) = tokio::join!(
            driver.send_command(&endpoint, set(ColorComponent::Red, 10)),
            driver.send_command(&endpoint, set(ColorComponent::Green, 20)),
        );
        assert_eq!(red.expect("red set failed"), Resolution::Acknowledged);
        assert_eq!(green.expect("green set failed"), Resolution::Acknowledged);

        let (supported, blue) = tokio::join!(
            driver.send_command(&endpoint, ColorSwitchCommand::SupportedGet.into()),
            driver.send_command(&endpoint, set(ColorComponent::Blue, 5)),
        );
        assert!(matches!(
            supported,
            Ok(Resolution::Response(Command::ColorSwitch(
                ColorSwitchCommand::SupportedReport { .. }
            )))
        ));
        assert_eq!(blue.expect("blue set failed"), Resolution::Acknowledged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_waits_for_pending() {
        let (driver, endpoint) = start(SimulatedNodeConfig {
            respond: false,
            ..Default::default()
        });
        let timeout = driver.config().response_timeout;
        let started = tokio::time::Instant::now();

        let timed = |command: Command| {
            let driver = driver.clone();
            let endpoint = endpoint.clone();
            async move {
                let result = driver.send_command(&endpoint, command).await;
                (result, started.elapsed())
            }
        };
        let blue_get: Command = ColorSwitchCommand::Get {
            component: ColorComponent::Blue,
        }
        .into();

        let ((first, first_at), (second, second_at), (blue, blue_at)) =
            tokio::join!(timed(red_get()), timed(red_get()), timed(blue_get));

        assert!(matches!(first, Err(ApiError::ResponseTimeout { .. })));
        assert!(matches!(second, Err(ApiError::ResponseTimeout { .. })));
        assert!(matches!(blue, Err(ApiError::ResponseTimeout { .. })));

        // The second red Get only went out once the first one ended
        assert!(first_at < timeout * 2);
        assert!(second_at >= timeout * 2);
        // A different selector is a different key
        assert!(blue_at < timeout * 2);
    }

    /// Hands every transmitted frame to the test, which plays the device
    struct ScriptedLink {
        sent: mpsc::UnboundedSender<TransmitRequest>,
    }

    #[async_trait]
    impl Transport for ScriptedLink {
        async fn transmit(&self, request: TransmitRequest) -> anyhow::Result<()> {
            self.sent
                .send(request)
                .map_err(|_| anyhow::anyhow!("test finished"))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_undecodable_frames_leave_pending_request_alone() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::channel(16);
        let driver = Driver::start(DriverConfig::default(), ScriptedLink { sent: sent_tx }, events);
        let endpoint = driver.add_endpoint(
            Endpoint::new(EndpointAddress::root(2)).with_class(CommandClassId::ColorSwitch, 3),
        );

        let pending = {
            let driver = driver.clone();
            let endpoint = endpoint.clone();
            tokio::spawn(async move { driver.send_command(&endpoint, red_get()).await })
        };

        let request = sent_rx.recv().await.expect("nothing transmitted");
        assert_eq!(&request.frame[..], &[0x33, 0x03, 0x02]);
        let address = request.address;
        event_tx
            .send(TransportEvent::TransmitReport {
                callback_id: request.callback_id,
                status: TransmitStatus::Ok,
            })
            .await
            .expect("driver stopped");

        let garbage: [&'static [u8]; 4] = [
            // Unknown Color Switch command
            &[0x33, 0x7E],
            // Report without its current value
            &[0x33, 0x04, 0x02],
            // Unknown class
            &[0x99, 0x01],
            // No command byte
            &[0x33],
        ];
        for frame in garbage {
            event_tx
                .send(TransportEvent::Frame {
                    address,
                    frame: Bytes::from_static(frame),
                })
                .await
                .expect("driver stopped");
        }
        event_tx
            .send(TransportEvent::Frame {
                address,
                frame: Bytes::from_static(&[0x33, 0x04, 0x02, 0x64, 0x78, 0x05]),
            })
            .await
            .expect("driver stopped");

        let resolution = pending
            .await
            .expect("task panicked")
            .expect("get failed");
        let expected: Command = ColorSwitchCommand::Report {
            component: ColorComponent::Red,
            current_value: 100,
            target_value: Some(120),
            duration: Some(CcDuration::seconds(5)),
        }
        .into();
        assert_eq!(resolution, Resolution::Response(expected));
        assert_eq!(
            driver
                .cache()
                .get(2, &color_switch::current_value_id(0, ColorComponent::Red)),
            Some(Value::Number(100))
        );
    }

    #[tokio::test]
    async fn test_report_is_not_sendable() {
        let (driver, endpoint) = start(SimulatedNodeConfig::default());
        let report = Command::Basic(BasicCommand::Report {
            current_value: 1,
            target_value: None,
            duration: None,
        });
        let err = driver.send_command(&endpoint, report).await.unwrap_err();
        assert!(matches!(err, ApiError::Encode(_)));
    }
}
