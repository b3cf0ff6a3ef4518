//! Simulated device
//!
//! An in-process node that speaks Basic and Color Switch. It acknowledges
//! every transmission according to its [`AckMode`], applies Sets to its own
//! state and answers Gets with reports encoded at its own protocol version.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use cc_protocol::cc::{basic, color_switch};
use cc_protocol::cc::color_switch::{
    ColorComponent, ColorSwitchCommand, LevelChangeDirection, SupportedColors,
};
use cc_protocol::codec::{encode_frame, split_frame};
use cc_protocol::{Command, CommandClassId, Duration as CcDuration};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace, warn};

use super::traits::{TransmitRequest, TransmitStatus, Transport, TransportEvent};
use crate::endpoint::{Endpoint, EndpointAddress};

/// How the simulated link answers transmissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    #[default]
    Acknowledge,
    /// Report every transmission as unacknowledged
    NoAck,
    /// Report every transmission as failed
    Fail,
}

/// Configuration for a simulated node
#[derive(Debug, Clone)]
pub struct SimulatedNodeConfig {
    pub node_id: u16,
    /// The one endpoint this node answers on
    pub endpoint: u8,
    /// Versions the node claims to implement
    pub color_switch_version: u8,
    pub basic_version: u8,
    pub supported_colors: Vec<ColorComponent>,
    pub ack_mode: AckMode,
    /// Whether Gets are answered at all
    pub respond: bool,
    /// Delay between acknowledging a frame and sending the answer
    pub response_delay: Duration,
}

impl Default for SimulatedNodeConfig {
    fn default() -> Self {
        Self {
            node_id: 2,
            endpoint: 0,
            color_switch_version: 3,
            basic_version: 2,
            supported_colors: vec![
                ColorComponent::WarmWhite,
                ColorComponent::Red,
                ColorComponent::Green,
                ColorComponent::Blue,
            ],
            ack_mode: AckMode::Acknowledge,
            respond: true,
            response_delay: Duration::from_millis(10),
        }
    }
}

impl SimulatedNodeConfig {
    pub fn address(&self) -> EndpointAddress {
        EndpointAddress::new(self.node_id, self.endpoint)
    }

    /// The endpoint as the node would describe itself
    pub fn describe_endpoint(&self) -> Endpoint {
        Endpoint::new(self.address())
            .with_class(CommandClassId::Basic, self.basic_version)
            .with_class(CommandClassId::ColorSwitch, self.color_switch_version)
    }
}

/// Transport backed by a simulated node
pub struct SimulatedNode {
    inbound_tx: mpsc::Sender<TransmitRequest>,
    received: Arc<RwLock<Vec<Bytes>>>,
}

impl SimulatedNode {
    /// Create the node and start its device loop. Returns the node and the
    /// receiver of its transport events.
    pub fn new(
        config: SimulatedNodeConfig,
        event_capacity: usize,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (inbound_tx, inbound_rx) = mpsc::channel::<TransmitRequest>(event_capacity);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(event_capacity);
        let received = Arc::new(RwLock::new(Vec::new()));

        let received_clone = received.clone();
        tokio::spawn(async move {
            device_loop(config, inbound_rx, event_tx, received_clone).await;
        });

        (
            Self {
                inbound_tx,
                received,
            },
            event_rx,
        )
    }

    /// Every frame transmitted to the node so far
    pub async fn received_frames(&self) -> Vec<Bytes> {
        self.received.read().await.clone()
    }

    /// A handle to the received-frame log that outlives the node
    pub fn frame_log(&self) -> FrameLog {
        FrameLog(self.received.clone())
    }
}

/// Shared view of the frames a [`SimulatedNode`] received
#[derive(Clone)]
pub struct FrameLog(Arc<RwLock<Vec<Bytes>>>);

impl FrameLog {
    pub async fn frames(&self) -> Vec<Bytes> {
        self.0.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.0.read().await.len()
    }
}

#[async_trait]
impl Transport for SimulatedNode {
    async fn transmit(&self, request: TransmitRequest) -> Result<()> {
        self.inbound_tx
            .send(request)
            .await
            .map_err(|_| anyhow!("Simulated node stopped"))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

async fn device_loop(
    config: SimulatedNodeConfig,
    mut inbound_rx: mpsc::Receiver<TransmitRequest>,
    event_tx: mpsc::Sender<TransportEvent>,
    received: Arc<RwLock<Vec<Bytes>>>,
) {
    let mut device = DeviceState::new(&config);

    while let Some(request) = inbound_rx.recv().await {
        received.write().await.push(request.frame.clone());

        let status = match config.ack_mode {
            AckMode::Acknowledge => TransmitStatus::Ok,
            AckMode::NoAck => TransmitStatus::NoAck,
            AckMode::Fail => TransmitStatus::Failed,
        };
        let report = TransportEvent::TransmitReport {
            callback_id: request.callback_id,
            status,
        };
        if event_tx.send(report).await.is_err() {
            break;
        }

        if !status.is_positive() || request.address != config.address() {
            continue;
        }

        let replies = device.handle(&request.frame);
        if !config.respond {
            continue;
        }
        for frame in replies {
            tokio::time::sleep(config.response_delay).await;
            trace!("[SIM] node {} replies {:02X?}", config.node_id, &frame[..]);
            let event = TransportEvent::Frame {
                address: request.address,
                frame,
            };
            if event_tx.send(event).await.is_err() {
                return;
            }
        }
    }

    debug!("[SIM] node {} stopped", config.node_id);
}

/// Device-side state and the device's own frame parser
struct DeviceState {
    levels: [u8; 9],
    supported: SupportedColors,
    basic_value: u8,
    color_switch_version: u8,
    basic_version: u8,
}

impl DeviceState {
    fn new(config: &SimulatedNodeConfig) -> Self {
        Self {
            levels: [0; 9],
            supported: SupportedColors::from_components(config.supported_colors.iter().copied()),
            basic_value: 0,
            color_switch_version: config.color_switch_version,
            basic_version: config.basic_version,
        }
    }

    fn level(&self, component: ColorComponent) -> u8 {
        self.levels[component.selector() as usize]
    }

    /// Apply a frame and return the frames to answer with
    fn handle(&mut self, frame: &[u8]) -> Vec<Bytes> {
        let raw = match split_frame(frame) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[SIM] dropping frame: {}", e);
                return Vec::new();
            }
        };

        match CommandClassId::try_from(raw.class) {
            Ok(CommandClassId::ColorSwitch) => self.handle_color(raw.command, raw.payload),
            Ok(CommandClassId::Basic) => self.handle_basic(raw.command, raw.payload),
            Err(class) => {
                debug!("[SIM] ignoring class 0x{:02X}", class);
                Vec::new()
            }
        }
    }

    fn handle_color(&mut self, command: u8, payload: &[u8]) -> Vec<Bytes> {
        match command {
            color_switch::SUPPORTED_GET => self.reply(ColorSwitchCommand::SupportedReport {
                supported: self.supported,
            }),

            color_switch::GET => {
                let Some(component) = selector_at(payload, 0) else {
                    return Vec::new();
                };
                let level = self.level(component);
                self.reply(ColorSwitchCommand::Report {
                    component,
                    current_value: level,
                    target_value: Some(level),
                    duration: Some(CcDuration::seconds(0)),
                })
            }

            color_switch::SET => {
                let count = payload.first().map(|c| (c & 0x1F) as usize).unwrap_or(0);
                for pair in payload.get(1..).unwrap_or(&[]).chunks_exact(2).take(count) {
                    if let Ok(component) = ColorComponent::try_from(pair[0]) {
                        self.levels[component.selector() as usize] = pair[1];
                    }
                }
                Vec::new()
            }

            color_switch::START_LEVEL_CHANGE => {
                let direction = match payload.first() {
                    Some(flags) if flags & 0x40 != 0 => LevelChangeDirection::Down,
                    _ => LevelChangeDirection::Up,
                };
                if let Some(component) = selector_at(payload, 1) {
                    self.levels[component.selector() as usize] = match direction {
                        LevelChangeDirection::Up => 0xFF,
                        LevelChangeDirection::Down => 0x00,
                    };
                }
                Vec::new()
            }

            _ => Vec::new(),
        }
    }

    fn handle_basic(&mut self, command: u8, payload: &[u8]) -> Vec<Bytes> {
        match command {
            basic::SET => {
                if let Some(value) = payload.first() {
                    self.basic_value = *value;
                }
                Vec::new()
            }
            basic::GET => {
                // Basic reports have no encoder on the controller side
                let mut buf = BytesMut::with_capacity(5);
                buf.put_u8(CommandClassId::Basic as u8);
                buf.put_u8(basic::REPORT);
                buf.put_u8(self.basic_value);
                if self.basic_version >= basic::REPORT_TARGET_VERSION {
                    buf.put_u8(self.basic_value);
                    buf.put_u8(0x00);
                }
                vec![buf.freeze()]
            }
            _ => Vec::new(),
        }
    }

    fn reply(&self, command: ColorSwitchCommand) -> Vec<Bytes> {
        match encode_frame(&Command::from(command), self.color_switch_version) {
            Ok(frame) => vec![frame],
            Err(e) => {
                warn!("[SIM] cannot encode reply: {}", e);
                Vec::new()
            }
        }
    }
}

fn selector_at(payload: &[u8], index: usize) -> Option<ColorComponent> {
    payload
        .get(index)
        .and_then(|s| ColorComponent::try_from(*s).ok())
}
