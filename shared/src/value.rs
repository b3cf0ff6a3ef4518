//! Value cache addressing and metadata
//!
//! The cache itself lives in the driver; this module only defines how a slot
//! is addressed and what a command writes into it.

use crate::{duration::Duration, CommandClassId};

/// Address of one slot in a node's value cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId {
    pub command_class: CommandClassId,
    pub endpoint: u8,
    pub property: String,
    pub property_key: Option<String>,
}

impl ValueId {
    pub fn new(command_class: CommandClassId, endpoint: u8, property: impl Into<String>) -> Self {
        Self {
            command_class,
            endpoint,
            property: property.into(),
            property_key: None,
        }
    }

    pub fn with_key(mut self, property_key: impl Into<String>) -> Self {
        self.property_key = Some(property_key.into());
        self
    }
}

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}].{}",
            self.command_class.name(),
            self.endpoint,
            self.property
        )?;
        if let Some(key) = &self.property_key {
            write!(f, ".{}", key)?;
        }
        Ok(())
    }
}

/// A cached value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(i64),
    Duration(Duration),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Short type name, used in argument errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Duration(_) => "duration",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Number(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Any,
    Number,
    Boolean,
    Duration,
}

/// Describes a cached value to whoever presents or writes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMetadata {
    pub value_type: ValueType,
    pub readable: bool,
    pub writeable: bool,
    pub label: Option<String>,
    pub description: Option<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl ValueMetadata {
    pub fn read_only() -> Self {
        Self {
            value_type: ValueType::Any,
            readable: true,
            writeable: false,
            label: None,
            description: None,
            min: None,
            max: None,
        }
    }

    pub fn number() -> Self {
        Self {
            value_type: ValueType::Number,
            writeable: true,
            ..Self::read_only()
        }
    }

    pub fn read_only_number() -> Self {
        Self {
            value_type: ValueType::Number,
            ..Self::read_only()
        }
    }

    pub fn read_only_boolean() -> Self {
        Self {
            value_type: ValueType::Boolean,
            ..Self::read_only()
        }
    }

    pub fn read_only_duration() -> Self {
        Self {
            value_type: ValueType::Duration,
            ..Self::read_only()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// A cache write derived from a decoded command
#[derive(Debug, Clone, PartialEq)]
pub struct ValueUpdate {
    pub id: ValueId,
    pub value: Value,
}

impl ValueUpdate {
    pub fn new(id: ValueId, value: impl Into<Value>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }
}
