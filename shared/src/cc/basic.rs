//! Basic command class (0x20)
//!
//! ```text
//! Set     target
//! Get     -
//! Report  current [target duration]   (v2+)
//! ```

use bytes::{BufMut, BytesMut};

use crate::codec::{clamp_u8, Command, CommandKind, DecodeError, EncodeError};
use crate::duration::Duration;
use crate::registry::{ClassDescriptor, CommandDescriptor};
use crate::value::{ValueId, ValueUpdate};
use crate::CommandClassId;

pub const IMPLEMENTED_VERSION: u8 = 2;

pub const SET: u8 = 0x01;
pub const GET: u8 = 0x02;
pub const REPORT: u8 = 0x03;

/// Version that adds target value and duration to Report
pub const REPORT_TARGET_VERSION: u8 = 2;

pub const PROPERTY_CURRENT: &str = "currentValue";
pub const PROPERTY_TARGET: &str = "targetValue";
pub const PROPERTY_DURATION: &str = "duration";

#[derive(Debug, Clone, PartialEq)]
pub enum BasicCommand {
    Set {
        /// Clamped to a byte when encoded
        target_value: i64,
    },
    Get,
    Report {
        current_value: u8,
        target_value: Option<u8>,
        duration: Option<Duration>,
    },
}

pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        id: SET,
        name: "Set",
        kind: CommandKind::Set,
        min_payload: 1,
        expected_response: None,
        decode: None,
    },
    CommandDescriptor {
        id: GET,
        name: "Get",
        kind: CommandKind::Get,
        min_payload: 0,
        expected_response: Some(REPORT),
        decode: None,
    },
    CommandDescriptor {
        id: REPORT,
        name: "Report",
        kind: CommandKind::Report,
        min_payload: 1,
        expected_response: None,
        decode: Some(decode_report),
    },
];

pub fn descriptor() -> ClassDescriptor {
    ClassDescriptor {
        id: CommandClassId::Basic,
        implemented_version: IMPLEMENTED_VERSION,
        commands: COMMANDS,
        predicate: None,
    }
}

fn decode_report(payload: &[u8], version: u8) -> Result<Command, DecodeError> {
    let (target_value, duration) = match payload.get(1..3) {
        Some(&[target, duration]) if version >= REPORT_TARGET_VERSION => {
            (Some(target), Duration::parse_report(duration))
        }
        _ => (None, None),
    };

    Ok(BasicCommand::Report {
        current_value: payload[0],
        target_value,
        duration,
    }
    .into())
}

pub fn current_value_id(endpoint: u8) -> ValueId {
    ValueId::new(CommandClassId::Basic, endpoint, PROPERTY_CURRENT)
}

pub fn target_value_id(endpoint: u8) -> ValueId {
    ValueId::new(CommandClassId::Basic, endpoint, PROPERTY_TARGET)
}

pub fn duration_value_id(endpoint: u8) -> ValueId {
    ValueId::new(CommandClassId::Basic, endpoint, PROPERTY_DURATION)
}

impl BasicCommand {
    pub fn command_id(&self) -> u8 {
        match self {
            BasicCommand::Set { .. } => SET,
            BasicCommand::Get => GET,
            BasicCommand::Report { .. } => REPORT,
        }
    }

    pub(crate) fn encode_into(&self, _version: u8, buf: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            BasicCommand::Set { target_value } => {
                buf.put_u8(SET);
                buf.put_u8(clamp_u8(*target_value));
            }
            BasicCommand::Get => buf.put_u8(GET),
            BasicCommand::Report { .. } => {
                return Err(EncodeError::UnsupportedCommandKind {
                    class: CommandClassId::Basic,
                    command: REPORT,
                })
            }
        }
        Ok(())
    }

    pub(crate) fn value_updates(&self, endpoint: u8) -> Vec<ValueUpdate> {
        let BasicCommand::Report {
            current_value,
            target_value,
            duration,
        } = self
        else {
            return Vec::new();
        };

        let mut updates = vec![ValueUpdate::new(current_value_id(endpoint), *current_value)];
        if let Some(target) = target_value {
            updates.push(ValueUpdate::new(target_value_id(endpoint), *target));
        }
        if let Some(duration) = duration {
            updates.push(ValueUpdate::new(duration_value_id(endpoint), *duration));
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;

    #[test]
    fn test_set_and_get_encoding() {
        let set = Command::Basic(BasicCommand::Set { target_value: 99 });
        assert_eq!(&set.encode(1).expect("encode failed")[..], &[0x01, 0x63]);

        let set = Command::Basic(BasicCommand::Set { target_value: 1000 });
        assert_eq!(&set.encode(2).expect("encode failed")[..], &[0x01, 0xFF]);

        let get = Command::Basic(BasicCommand::Get);
        assert_eq!(&get.encode(2).expect("encode failed")[..], &[0x02]);
    }

    #[test]
    fn test_report_is_not_encodable() {
        let report = Command::Basic(BasicCommand::Report {
            current_value: 1,
            target_value: None,
            duration: None,
        });
        assert_eq!(
            report.encode(2),
            Err(EncodeError::UnsupportedCommandKind {
                class: CommandClassId::Basic,
                command: REPORT
            })
        );
    }

    #[test]
    fn test_report_v1_and_v2() {
        let v1 = decode(CommandClassId::Basic, REPORT, &[0x20, 0x30, 0x01], 1).expect("decode failed");
        assert_eq!(
            v1,
            Command::Basic(BasicCommand::Report {
                current_value: 0x20,
                target_value: None,
                duration: None,
            })
        );

        let v2 = decode(CommandClassId::Basic, REPORT, &[0x20, 0x30, 0x01], 2).expect("decode failed");
        assert_eq!(
            v2,
            Command::Basic(BasicCommand::Report {
                current_value: 0x20,
                target_value: Some(0x30),
                duration: Some(Duration::seconds(1)),
            })
        );
    }

    #[test]
    fn test_empty_report_is_too_short() {
        let err = decode(CommandClassId::Basic, REPORT, &[], 2).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadTooShort { needed: 1, .. }));
    }

    #[test]
    fn test_report_value_updates() {
        let report = Command::Basic(BasicCommand::Report {
            current_value: 5,
            target_value: Some(10),
            duration: Some(Duration::seconds(3)),
        });
        let updates = report.value_updates(2);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].id, current_value_id(2));
        assert_eq!(updates[2].value, crate::Value::Duration(Duration::seconds(3)));
        assert!(Command::Basic(BasicCommand::Get).value_updates(2).is_empty());
    }
}
