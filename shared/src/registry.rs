//! Command registry
//!
//! An explicit table from (class, command id) to decoder and metadata,
//! populated once at startup through [`RegistryBuilder`]. Each class also
//! declares the highest protocol version this crate implements and,
//! optionally, its own correlation predicate.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::codec::{Command, CommandKind, DecodeError};
use crate::correlation::{default_predicate, fallback, Classification, CorrelationPredicate};
use crate::CommandClassId;

/// Decodes a command payload (bytes after the command id) at a given
/// negotiated version. Called only after the minimum length was checked.
pub type DecodeFn = fn(&[u8], u8) -> Result<Command, DecodeError>;

/// Static description of one command
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub id: u8,
    pub name: &'static str,
    pub kind: CommandKind,
    /// Fixed payload length below which nothing can be parsed
    pub min_payload: usize,
    /// Command id of the expected answer
    pub expected_response: Option<u8>,
    /// `None` for construct-only commands
    pub decode: Option<DecodeFn>,
}

/// Static description of one command class
#[derive(Debug, Clone, Copy)]
pub struct ClassDescriptor {
    pub id: CommandClassId,
    pub implemented_version: u8,
    pub commands: &'static [CommandDescriptor],
    pub predicate: Option<CorrelationPredicate>,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    classes: Vec<ClassDescriptor>,
}

impl RegistryBuilder {
    pub fn register(mut self, class: ClassDescriptor) -> Self {
        self.classes.retain(|c| c.id != class.id);
        self.classes.push(class);
        self
    }

    pub fn build(self) -> Registry {
        let mut classes = HashMap::new();
        let mut commands = HashMap::new();
        for class in self.classes {
            for cmd in class.commands {
                commands.insert((class.id, cmd.id), *cmd);
            }
            classes.insert(class.id, class);
        }
        Registry { classes, commands }
    }
}

/// Lookup table for decode, version negotiation and correlation
#[derive(Debug)]
pub struct Registry {
    classes: HashMap<CommandClassId, ClassDescriptor>,
    commands: HashMap<(CommandClassId, u8), CommandDescriptor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry with every command class this crate implements
    pub fn standard() -> &'static Registry {
        static STANDARD: OnceLock<Registry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            Registry::builder()
                .register(crate::cc::basic::descriptor())
                .register(crate::cc::color_switch::descriptor())
                .build()
        })
    }

    pub fn is_registered(&self, class: CommandClassId) -> bool {
        self.classes.contains_key(&class)
    }

    pub fn command(&self, class: CommandClassId, command: u8) -> Option<&CommandDescriptor> {
        self.commands.get(&(class, command))
    }

    pub fn implemented_version(&self, class: CommandClassId) -> Option<u8> {
        self.classes.get(&class).map(|c| c.implemented_version)
    }

    /// Version to use with a device: the lower of what we implement and what
    /// the device reports. An unreported version (0) is treated as 1.
    pub fn negotiate_version(&self, class: CommandClassId, reported: u8) -> u8 {
        let ceiling = self.implemented_version(class).unwrap_or(1);
        ceiling.min(reported.max(1))
    }

    /// Command id of the answer a request expects, if any
    pub fn expected_response(&self, class: CommandClassId, command: u8) -> Option<u8> {
        self.command(class, command)
            .and_then(|d| d.expected_response)
    }

    /// Correlation predicate of a class, or the default rule
    pub fn predicate(&self, class: CommandClassId) -> CorrelationPredicate {
        self.classes
            .get(&class)
            .and_then(|c| c.predicate)
            .unwrap_or(default_predicate)
    }

    /// Decode a command payload at the given negotiated version.
    ///
    /// The payload length is checked against the command's minimum before
    /// the decoder touches any field.
    pub fn decode(
        &self,
        class: CommandClassId,
        command: u8,
        payload: &[u8],
        version: u8,
    ) -> Result<Command, DecodeError> {
        let descriptor = self
            .command(class, command)
            .ok_or(DecodeError::UnknownCommand {
                class: class as u8,
                command,
            })?;

        let decode = descriptor
            .decode
            .ok_or(DecodeError::UnsupportedCommandKind { class, command })?;

        if payload.len() < descriptor.min_payload {
            return Err(DecodeError::PayloadTooShort {
                class,
                command,
                needed: descriptor.min_payload,
                available: payload.len(),
            });
        }

        decode(payload, version)
    }

    /// Decode a raw class byte, for frames whose class may not be known
    pub fn decode_raw(
        &self,
        class: u8,
        command: u8,
        payload: &[u8],
        version: u8,
    ) -> Result<Command, DecodeError> {
        let class_id = CommandClassId::try_from(class)
            .ok()
            .filter(|id| self.is_registered(*id))
            .ok_or(DecodeError::UnknownCommand { class, command })?;
        self.decode(class_id, command, payload, version)
    }

    /// Classify an inbound command against a sent one.
    ///
    /// Commands of a different class are never an answer. Otherwise the
    /// sent command's class predicate decides, falling back to
    /// [`default_predicate`].
    pub fn classify(
        &self,
        sent: &Command,
        received: &Command,
        positive_transmit: bool,
    ) -> Classification {
        if sent.class() != received.class() {
            return fallback(positive_transmit);
        }
        self.predicate(sent.class())(sent, received, positive_transmit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cc::color_switch;

    #[test]
    fn test_negotiate_version() {
        let registry = Registry::standard();
        assert_eq!(registry.negotiate_version(CommandClassId::ColorSwitch, 5), 3);
        assert_eq!(registry.negotiate_version(CommandClassId::ColorSwitch, 2), 2);
        assert_eq!(registry.negotiate_version(CommandClassId::ColorSwitch, 0), 1);
        assert_eq!(registry.negotiate_version(CommandClassId::Basic, 9), 2);
    }

    #[test]
    fn test_expected_response() {
        let registry = Registry::standard();
        assert_eq!(
            registry.expected_response(CommandClassId::ColorSwitch, color_switch::GET),
            Some(color_switch::REPORT)
        );
        assert_eq!(
            registry.expected_response(CommandClassId::ColorSwitch, color_switch::SET),
            None
        );
    }

    #[test]
    fn test_construct_only_command_has_no_decoder() {
        let registry = Registry::standard();
        let err = registry
            .decode(CommandClassId::ColorSwitch, color_switch::GET, &[0x02], 3)
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedCommandKind { .. }));
    }

    #[test]
    fn test_unknown_class_byte() {
        let registry = Registry::standard();
        let err = registry.decode_raw(0x99, 0x01, &[], 1).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownCommand {
                class: 0x99,
                command: 0x01
            }
        );
    }

    #[test]
    fn test_builder_only_knows_registered_classes() {
        let registry = Registry::builder()
            .register(crate::cc::basic::descriptor())
            .build();
        assert!(registry.is_registered(CommandClassId::Basic));
        assert!(!registry.is_registered(CommandClassId::ColorSwitch));
        let err = registry
            .decode_raw(0x33, color_switch::REPORT, &[0x02, 0x10], 3)
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnknownCommand { .. }));
    }
}
