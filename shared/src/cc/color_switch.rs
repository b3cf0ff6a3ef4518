//! Color Switch command class (0x33)
//!
//! Byte layouts after the command id:
//! ```text
//! SupportedGet      -
//! SupportedReport   mask0 mask1            bit n of mask0 = channel n, bit 0 of mask1 = index
//! Get               selector
//! Report            selector current [target duration]      (v3+)
//! Set               count(5 bits) {selector value}* [duration] (v2+)
//! StartLevelChange  flags selector start [duration]           (v3+)
//! StopLevelChange   selector
//! ```

use bytes::{BufMut, BytesMut};

use crate::codec::{clamp_u8, Command, CommandKind, DecodeError, EncodeError};
use crate::correlation::{default_predicate, fallback, Classification};
use crate::duration::Duration;
use crate::registry::{ClassDescriptor, CommandDescriptor};
use crate::value::{ValueId, ValueUpdate};
use crate::CommandClassId;

pub const IMPLEMENTED_VERSION: u8 = 3;

pub const SUPPORTED_GET: u8 = 0x01;
pub const SUPPORTED_REPORT: u8 = 0x02;
pub const GET: u8 = 0x03;
pub const REPORT: u8 = 0x04;
pub const SET: u8 = 0x05;
pub const START_LEVEL_CHANGE: u8 = 0x06;
pub const STOP_LEVEL_CHANGE: u8 = 0x07;

/// Version that adds the duration byte to Set
pub const SET_DURATION_VERSION: u8 = 2;
/// Version that adds target value and duration to Report
pub const REPORT_TARGET_VERSION: u8 = 3;
/// Version that adds the duration byte to StartLevelChange
pub const LEVEL_CHANGE_DURATION_VERSION: u8 = 3;

pub const PROPERTY_SUPPORTED: &str = "supportedColor";
pub const PROPERTY_CURRENT: &str = "currentColor";
pub const PROPERTY_TARGET: &str = "targetColor";

const START_FLAG_DOWN: u8 = 1 << 6;
const START_FLAG_IGNORE_START_LEVEL: u8 = 1 << 5;
const SET_COUNT_MASK: u8 = 0b1_1111;

/// A color channel of a color switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ColorComponent {
    WarmWhite = 0,
    ColdWhite = 1,
    Red = 2,
    Green = 3,
    Blue = 4,
    Amber = 5,
    Cyan = 6,
    Purple = 7,
    Index = 8,
}

impl ColorComponent {
    /// Every channel, in wire selector order
    pub const ALL: [ColorComponent; 9] = [
        ColorComponent::WarmWhite,
        ColorComponent::ColdWhite,
        ColorComponent::Red,
        ColorComponent::Green,
        ColorComponent::Blue,
        ColorComponent::Amber,
        ColorComponent::Cyan,
        ColorComponent::Purple,
        ColorComponent::Index,
    ];

    pub fn selector(self) -> u8 {
        self as u8
    }

    /// Property key of the channel's current/target values
    pub fn key(self) -> &'static str {
        match self {
            ColorComponent::WarmWhite => "warmWhite",
            ColorComponent::ColdWhite => "coldWhite",
            ColorComponent::Red => "red",
            ColorComponent::Green => "green",
            ColorComponent::Blue => "blue",
            ColorComponent::Amber => "amber",
            ColorComponent::Cyan => "cyan",
            ColorComponent::Purple => "purple",
            ColorComponent::Index => "index",
        }
    }

    /// Property key of the channel's support flag
    pub fn supports_key(self) -> &'static str {
        match self {
            ColorComponent::WarmWhite => "supportsWarmWhite",
            ColorComponent::ColdWhite => "supportsColdWhite",
            ColorComponent::Red => "supportsRed",
            ColorComponent::Green => "supportsGreen",
            ColorComponent::Blue => "supportsBlue",
            ColorComponent::Amber => "supportsAmber",
            ColorComponent::Cyan => "supportsCyan",
            ColorComponent::Purple => "supportsPurple",
            ColorComponent::Index => "supportsIndex",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl TryFrom<u8> for ColorComponent {
    type Error = u8;

    fn try_from(selector: u8) -> Result<Self, u8> {
        Self::ALL
            .get(selector as usize)
            .copied()
            .ok_or(selector)
    }
}

impl std::fmt::Display for ColorComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Channels an endpoint supports, as a bitmask indexed by selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupportedColors(u16);

impl SupportedColors {
    pub fn from_components(components: impl IntoIterator<Item = ColorComponent>) -> Self {
        let mask = components
            .into_iter()
            .fold(0u16, |mask, c| mask | (1 << c.selector()));
        Self(mask)
    }

    pub fn supports(&self, component: ColorComponent) -> bool {
        self.0 & (1 << component.selector()) != 0
    }

    pub fn components(&self) -> impl Iterator<Item = ColorComponent> + '_ {
        ColorComponent::ALL.into_iter().filter(|c| self.supports(*c))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Requested levels per channel. Unset channels are left alone by a Set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorTable {
    levels: [Option<i64>; 9],
}

impl ColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, component: ColorComponent, level: i64) -> Self {
        self.levels[component.selector() as usize] = Some(level);
        self
    }

    pub fn get(&self, component: ColorComponent) -> Option<i64> {
        self.levels[component.selector() as usize]
    }

    /// Populated channels in selector order, whatever order they were set in
    pub fn iter(&self) -> impl Iterator<Item = (ColorComponent, i64)> + '_ {
        ColorComponent::ALL
            .into_iter()
            .filter_map(|c| self.get(c).map(|level| (c, level)))
    }

    pub fn len(&self) -> usize {
        self.levels.iter().filter(|l| l.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelChangeDirection {
    #[default]
    Up,
    Down,
}

/// Color Switch commands
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSwitchCommand {
    SupportedGet,
    SupportedReport {
        supported: SupportedColors,
    },
    Get {
        component: ColorComponent,
    },
    Report {
        component: ColorComponent,
        current_value: u8,
        /// `None` below v3 or when the device omitted it
        target_value: Option<u8>,
        /// `None` below v3, when omitted, or for the reserved byte
        duration: Option<Duration>,
    },
    Set {
        colors: ColorTable,
        duration: Duration,
    },
    StartLevelChange {
        component: ColorComponent,
        direction: LevelChangeDirection,
        /// `None` lets the device start from its current level
        start_level: Option<u8>,
        duration: Duration,
    },
    StopLevelChange {
        component: ColorComponent,
    },
}

pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        id: SUPPORTED_GET,
        name: "SupportedGet",
        kind: CommandKind::Get,
        min_payload: 0,
        expected_response: Some(SUPPORTED_REPORT),
        decode: None,
    },
    CommandDescriptor {
        id: SUPPORTED_REPORT,
        name: "SupportedReport",
        kind: CommandKind::Report,
        min_payload: 2,
        expected_response: None,
        decode: Some(decode_supported_report),
    },
    CommandDescriptor {
        id: GET,
        name: "Get",
        kind: CommandKind::Get,
        min_payload: 1,
        expected_response: Some(REPORT),
        decode: None,
    },
    CommandDescriptor {
        id: REPORT,
        name: "Report",
        kind: CommandKind::Report,
        min_payload: 2,
        expected_response: None,
        decode: Some(decode_report),
    },
    CommandDescriptor {
        id: SET,
        name: "Set",
        kind: CommandKind::Set,
        min_payload: 1,
        expected_response: None,
        decode: None,
    },
    CommandDescriptor {
        id: START_LEVEL_CHANGE,
        name: "StartLevelChange",
        kind: CommandKind::Control,
        min_payload: 3,
        expected_response: None,
        decode: None,
    },
    CommandDescriptor {
        id: STOP_LEVEL_CHANGE,
        name: "StopLevelChange",
        kind: CommandKind::Control,
        min_payload: 1,
        expected_response: None,
        decode: None,
    },
];

pub fn descriptor() -> ClassDescriptor {
    ClassDescriptor {
        id: CommandClassId::ColorSwitch,
        implemented_version: IMPLEMENTED_VERSION,
        commands: COMMANDS,
        predicate: Some(predicate),
    }
}

/// A Get is only answered by the Report for the same channel
fn predicate(sent: &Command, received: &Command, positive_transmit: bool) -> Classification {
    match (sent, received) {
        (
            Command::ColorSwitch(ColorSwitchCommand::Get { component: wanted }),
            Command::ColorSwitch(ColorSwitchCommand::Report { component, .. }),
        ) if wanted == component => Classification::Final,
        (Command::ColorSwitch(ColorSwitchCommand::Get { .. }), _) => fallback(positive_transmit),
        _ => default_predicate(sent, received, positive_transmit),
    }
}

fn decode_supported_report(payload: &[u8], _version: u8) -> Result<Command, DecodeError> {
    let mask = u16::from(payload[0]) | (u16::from(payload[1] & 0x01) << 8);
    Ok(ColorSwitchCommand::SupportedReport {
        supported: SupportedColors(mask),
    }
    .into())
}

fn decode_report(payload: &[u8], version: u8) -> Result<Command, DecodeError> {
    let component =
        ColorComponent::try_from(payload[0]).map_err(|selector| DecodeError::MalformedField {
            class: CommandClassId::ColorSwitch,
            command: REPORT,
            field: "color component",
            reason: format!("unknown selector {}", selector),
        })?;
    let current_value = payload[1];

    let (target_value, duration) = match payload.get(2..4) {
        Some(&[target, duration]) if version >= REPORT_TARGET_VERSION => {
            (Some(target), Duration::parse_report(duration))
        }
        _ => (None, None),
    };

    Ok(ColorSwitchCommand::Report {
        component,
        current_value,
        target_value,
        duration,
    }
    .into())
}

pub fn supported_value_id(endpoint: u8, component: ColorComponent) -> ValueId {
    ValueId::new(CommandClassId::ColorSwitch, endpoint, PROPERTY_SUPPORTED)
        .with_key(component.supports_key())
}

pub fn current_value_id(endpoint: u8, component: ColorComponent) -> ValueId {
    ValueId::new(CommandClassId::ColorSwitch, endpoint, PROPERTY_CURRENT).with_key(component.key())
}

pub fn target_value_id(endpoint: u8, component: ColorComponent) -> ValueId {
    ValueId::new(CommandClassId::ColorSwitch, endpoint, PROPERTY_TARGET).with_key(component.key())
}

impl ColorSwitchCommand {
    pub fn command_id(&self) -> u8 {
        match self {
            ColorSwitchCommand::SupportedGet => SUPPORTED_GET,
            ColorSwitchCommand::SupportedReport { .. } => SUPPORTED_REPORT,
            ColorSwitchCommand::Get { .. } => GET,
            ColorSwitchCommand::Report { .. } => REPORT,
            ColorSwitchCommand::Set { .. } => SET,
            ColorSwitchCommand::StartLevelChange { .. } => START_LEVEL_CHANGE,
            ColorSwitchCommand::StopLevelChange { .. } => STOP_LEVEL_CHANGE,
        }
    }

    pub(crate) fn correlation_key(&self) -> Option<u8> {
        match self {
            ColorSwitchCommand::Get { component } | ColorSwitchCommand::Report { component, .. } => {
                Some(component.selector())
            }
            _ => None,
        }
    }

    pub(crate) fn encode_into(&self, version: u8, buf: &mut BytesMut) -> Result<(), EncodeError> {
        buf.put_u8(self.command_id());

        match self {
            ColorSwitchCommand::SupportedGet => {}

            ColorSwitchCommand::SupportedReport { supported } => {
                buf.put_u8((supported.0 & 0xFF) as u8);
                buf.put_u8((supported.0 >> 8) as u8 & 0x01);
            }

            ColorSwitchCommand::Get { component } => {
                buf.put_u8(component.selector());
            }

            ColorSwitchCommand::Report {
                component,
                current_value,
                target_value,
                duration,
            } => {
                buf.put_u8(component.selector());
                buf.put_u8(*current_value);
                if let (Some(target), true) = (target_value, version >= REPORT_TARGET_VERSION) {
                    buf.put_u8(*target);
                    buf.put_u8(duration.map(|d| d.serialize_report()).unwrap_or(0xFF));
                }
            }

            ColorSwitchCommand::Set { colors, duration } => {
                buf.put_u8(colors.len() as u8 & SET_COUNT_MASK);
                for (component, level) in colors.iter() {
                    buf.put_u8(component.selector());
                    buf.put_u8(clamp_u8(level));
                }
                if version >= SET_DURATION_VERSION {
                    buf.put_u8(duration.serialize_set());
                }
            }

            ColorSwitchCommand::StartLevelChange {
                component,
                direction,
                start_level,
                duration,
            } => {
                let mut flags = 0;
                if *direction == LevelChangeDirection::Down {
                    flags |= START_FLAG_DOWN;
                }
                if start_level.is_none() {
                    flags |= START_FLAG_IGNORE_START_LEVEL;
                }
                buf.put_u8(flags);
                buf.put_u8(component.selector());
                buf.put_u8(start_level.unwrap_or(0));
                if version >= LEVEL_CHANGE_DURATION_VERSION {
                    buf.put_u8(duration.serialize_set());
                }
            }

            ColorSwitchCommand::StopLevelChange { component } => {
                buf.put_u8(component.selector());
            }
        }

        Ok(())
    }

    pub(crate) fn value_updates(&self, endpoint: u8) -> Vec<ValueUpdate> {
        match self {
            ColorSwitchCommand::SupportedReport { supported } => ColorComponent::ALL
                .into_iter()
                .map(|c| ValueUpdate::new(supported_value_id(endpoint, c), supported.supports(c)))
                .collect(),

            ColorSwitchCommand::Report {
                component,
                current_value,
                target_value,
                ..
            } => {
                let mut updates = vec![ValueUpdate::new(
                    current_value_id(endpoint, *component),
                    *current_value,
                )];
                if let Some(target) = target_value {
                    updates.push(ValueUpdate::new(
                        target_value_id(endpoint, *component),
                        *target,
                    ));
                }
                updates
            }

            _ => Vec::new(),
        }
    }
}
