//! Command-class protocol types
//!
//! This crate provides the typed commands, codec, registry and correlation
//! rules shared by anything that talks to devices at the command-class
//! layer. It performs no I/O.

pub mod cc;
pub mod codec;
pub mod correlation;
pub mod duration;
pub mod registry;
pub mod state_machine;
pub mod value;

pub use codec::{Command, CommandKind, DecodeError, EncodeError};
pub use correlation::Classification;
pub use duration::{Duration, DurationUnit};
pub use registry::Registry;
pub use state_machine::{InterviewEvent, InterviewKind, InterviewProgress, InterviewState};
pub use value::{Value, ValueId, ValueMetadata, ValueType, ValueUpdate};

/// Command class identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CommandClassId {
    Basic = 0x20,
    ColorSwitch = 0x33,
}

impl CommandClassId {
    pub fn name(self) -> &'static str {
        match self {
            CommandClassId::Basic => "Basic",
            CommandClassId::ColorSwitch => "Color Switch",
        }
    }
}

impl std::fmt::Display for CommandClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for CommandClassId {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, u8> {
        match id {
            0x20 => Ok(CommandClassId::Basic),
            0x33 => Ok(CommandClassId::ColorSwitch),
            other => Err(other),
        }
    }
}
