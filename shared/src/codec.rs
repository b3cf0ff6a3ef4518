//! Command encode/decode
//!
//! Every command travels as a command-class frame:
//! ```text
//! [ 1 byte: class id ][ 1 byte: command id ][ N bytes: command payload ]
//! ```
//! A command *body* is everything after the class id, so byte 0 of a body is
//! always the command id. Field layouts may grow with the protocol version;
//! fields gated behind a version are only read or written when the
//! negotiated version allows it.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::cc::{basic::BasicCommand, color_switch::ColorSwitchCommand};
use crate::registry::{CommandDescriptor, Registry};
use crate::value::ValueUpdate;
use crate::CommandClassId;

/// Errors that can occur while decoding an inbound command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Frame too short: {0} bytes (need class and command id)")]
    FrameTooShort(usize),

    #[error("{class} command 0x{command:02X}: payload too short: need {needed} bytes, have {available}")]
    PayloadTooShort {
        class: CommandClassId,
        command: u8,
        needed: usize,
        available: usize,
    },

    #[error("Unknown command: class 0x{class:02X}, command 0x{command:02X}")]
    UnknownCommand { class: u8, command: u8 },

    #[error("{class} command 0x{command:02X}: malformed {field}: {reason}")]
    MalformedField {
        class: CommandClassId,
        command: u8,
        field: &'static str,
        reason: String,
    },

    #[error("{class} command 0x{command:02X} has no decoder")]
    UnsupportedCommandKind { class: CommandClassId, command: u8 },
}

/// Errors that can occur while encoding an outbound command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{class} command 0x{command:02X} has no wire representation")]
    UnsupportedCommandKind { class: CommandClassId, command: u8 },
}

/// Role a command plays in an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Asks the device for a report
    Get,
    /// Changes device state
    Set,
    /// Carries device state back
    Report,
    /// Starts or stops an ongoing device action
    Control,
}

/// A typed command of any registered command class
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Basic(BasicCommand),
    ColorSwitch(ColorSwitchCommand),
}

impl Command {
    pub fn class(&self) -> CommandClassId {
        match self {
            Command::Basic(_) => CommandClassId::Basic,
            Command::ColorSwitch(_) => CommandClassId::ColorSwitch,
        }
    }

    pub fn command_id(&self) -> u8 {
        match self {
            Command::Basic(cmd) => cmd.command_id(),
            Command::ColorSwitch(cmd) => cmd.command_id(),
        }
    }

    fn descriptor(&self) -> Option<&'static CommandDescriptor> {
        let commands = match self {
            Command::Basic(_) => crate::cc::basic::COMMANDS,
            Command::ColorSwitch(_) => crate::cc::color_switch::COMMANDS,
        };
        let id = self.command_id();
        commands.iter().find(|d| d.id == id)
    }

    pub fn kind(&self) -> CommandKind {
        self.descriptor()
            .map(|d| d.kind)
            .unwrap_or(CommandKind::Control)
    }

    /// Command id of the answer this command asks for, if any
    pub fn expected_response(&self) -> Option<u8> {
        self.descriptor().and_then(|d| d.expected_response)
    }

    /// Class-specific part of the answer that must match this request, e.g.
    /// the color selector of a Get
    pub fn correlation_key(&self) -> Option<u8> {
        match self {
            Command::Basic(_) => None,
            Command::ColorSwitch(cmd) => cmd.correlation_key(),
        }
    }

    /// Encode the command body (command id first) for the given version
    pub fn encode(&self, version: u8) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::with_capacity(8);
        match self {
            Command::Basic(cmd) => cmd.encode_into(version, &mut buf)?,
            Command::ColorSwitch(cmd) => cmd.encode_into(version, &mut buf)?,
        }
        Ok(buf.freeze())
    }

    /// Cache writes implied by this command.
    ///
    /// Only reports carry device state; for everything else this is empty.
    pub fn value_updates(&self, endpoint: u8) -> Vec<ValueUpdate> {
        match self {
            Command::Basic(cmd) => cmd.value_updates(endpoint),
            Command::ColorSwitch(cmd) => cmd.value_updates(endpoint),
        }
    }
}

impl From<BasicCommand> for Command {
    fn from(cmd: BasicCommand) -> Self {
        Command::Basic(cmd)
    }
}

impl From<ColorSwitchCommand> for Command {
    fn from(cmd: ColorSwitchCommand) -> Self {
        Command::ColorSwitch(cmd)
    }
}

/// Encode a command body for the given negotiated version
pub fn encode(command: &Command, version: u8) -> Result<Bytes, EncodeError> {
    command.encode(version)
}

/// Decode a command payload (the bytes after the command id) using the
/// standard registry
pub fn decode(
    class: CommandClassId,
    command: u8,
    payload: &[u8],
    version: u8,
) -> Result<Command, DecodeError> {
    Registry::standard().decode(class, command, payload, version)
}

/// Encode a full frame: class id followed by the command body
pub fn encode_frame(command: &Command, version: u8) -> Result<Bytes, EncodeError> {
    let body = command.encode(version)?;
    let mut buf = BytesMut::with_capacity(1 + body.len());
    buf.put_u8(command.class() as u8);
    buf.put_slice(&body);
    Ok(buf.freeze())
}

/// A frame split into its raw parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub class: u8,
    pub command: u8,
    pub payload: &'a [u8],
}

/// Split a frame into class id, command id and payload without
/// interpreting the payload
pub fn split_frame(frame: &[u8]) -> Result<RawFrame<'_>, DecodeError> {
    match frame {
        [class, command, payload @ ..] => Ok(RawFrame {
            class: *class,
            command: *command,
            payload,
        }),
        _ => Err(DecodeError::FrameTooShort(frame.len())),
    }
}

/// Clamp a caller-supplied number into a wire byte
pub fn clamp_u8(value: i64) -> u8 {
    value.clamp(0, 0xFF) as u8
}
