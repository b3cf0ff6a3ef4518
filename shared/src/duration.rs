//! Transition durations
//!
//! Devices encode durations in a single byte. Reports and Sets use slightly
//! different tables:
//! ```text
//! 0x00        instantly (0 seconds)
//! 0x01..=0x7F 1..=127 seconds
//! 0x80..=0xFD 1..=126 minutes
//! 0xFE        unknown (report only)
//! 0xFF        reserved in reports, "device default" in sets
//! ```

/// Unit of a [`Duration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Seconds,
    Minutes,
    /// The device could not tell how long the transition takes
    Unknown,
    /// Let the device use its configured default
    Default,
}

/// A transition duration as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    pub value: u8,
    pub unit: DurationUnit,
}

/// Largest number of seconds that fits the seconds range
const MAX_SECONDS: u32 = 0x7F;
/// Largest number of minutes that fits the minutes range
const MAX_MINUTES: u32 = 0xFD - 0x7F;

const UNKNOWN_BYTE: u8 = 0xFE;
const DEFAULT_BYTE: u8 = 0xFF;

impl Duration {
    pub fn seconds(value: u32) -> Self {
        if value <= MAX_SECONDS {
            Self {
                value: value as u8,
                unit: DurationUnit::Seconds,
            }
        } else {
            Self::minutes(value / 60 + u32::from(value % 60 >= 30))
        }
    }

    pub fn minutes(value: u32) -> Self {
        Self {
            value: value.clamp(1, MAX_MINUTES) as u8,
            unit: DurationUnit::Minutes,
        }
    }

    pub const fn unknown() -> Self {
        Self {
            value: 0,
            unit: DurationUnit::Unknown,
        }
    }

    pub const fn device_default() -> Self {
        Self {
            value: 0,
            unit: DurationUnit::Default,
        }
    }

    /// Parse a duration byte from a report. `None` for the reserved value.
    pub fn parse_report(byte: u8) -> Option<Self> {
        match byte {
            0x00..=0x7F => Some(Self {
                value: byte,
                unit: DurationUnit::Seconds,
            }),
            0x80..=0xFD => Some(Self {
                value: byte - 0x7F,
                unit: DurationUnit::Minutes,
            }),
            UNKNOWN_BYTE => Some(Self::unknown()),
            DEFAULT_BYTE => None,
        }
    }

    /// Encode for a report. A default duration is not reportable and
    /// becomes "unknown".
    pub fn serialize_report(&self) -> u8 {
        match self.unit {
            DurationUnit::Seconds => self.value.min(MAX_SECONDS as u8),
            DurationUnit::Minutes => 0x7F + self.value.clamp(1, MAX_MINUTES as u8),
            DurationUnit::Unknown | DurationUnit::Default => UNKNOWN_BYTE,
        }
    }

    /// Encode for a set/control command. Unknown falls back to the device
    /// default.
    pub fn serialize_set(&self) -> u8 {
        match self.unit {
            DurationUnit::Seconds => self.value.min(MAX_SECONDS as u8),
            DurationUnit::Minutes => 0x7F + self.value.clamp(1, MAX_MINUTES as u8),
            DurationUnit::Unknown | DurationUnit::Default => DEFAULT_BYTE,
        }
    }

}

impl Default for Duration {
    fn default() -> Self {
        Self::device_default()
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unit {
            DurationUnit::Seconds => write!(f, "{}s", self.value),
            DurationUnit::Minutes => write!(f, "{}min", self.value),
            DurationUnit::Unknown => write!(f, "unknown"),
            DurationUnit::Default => write!(f, "default"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_ranges() {
        assert_eq!(Duration::parse_report(0), Some(Duration::seconds(0)));
        assert_eq!(Duration::parse_report(5), Some(Duration::seconds(5)));
        assert_eq!(Duration::parse_report(0x80), Some(Duration::minutes(1)));
        assert_eq!(Duration::parse_report(0xFD), Some(Duration::minutes(126)));
        assert_eq!(Duration::parse_report(0xFE), Some(Duration::unknown()));
        assert_eq!(Duration::parse_report(0xFF), None);
    }

    #[test]
    fn test_long_seconds_become_minutes() {
        let d = Duration::seconds(600);
        assert_eq!(d.unit, DurationUnit::Minutes);
        assert_eq!(d.value, 10);
        assert_eq!(d.serialize_set(), 0x7F + 10);
    }

    #[test]
    fn test_seconds_round_to_nearest_minute_without_overflow() {
        assert_eq!(Duration::seconds(128), Duration::minutes(2));
        assert_eq!(Duration::seconds(149), Duration::minutes(2));
        assert_eq!(Duration::seconds(150), Duration::minutes(3));
        assert_eq!(Duration::seconds(u32::MAX - 29), Duration::minutes(126));
        assert_eq!(Duration::seconds(u32::MAX), Duration::minutes(126));
        assert_eq!(Duration::seconds(u32::MAX).serialize_set(), 0xFD);
    }

    #[test]
    fn test_default_serializes_per_direction() {
        let d = Duration::device_default();
        assert_eq!(d.serialize_set(), 0xFF);
        assert_eq!(d.serialize_report(), 0xFE);
    }

    #[test]
    fn test_minutes_are_capped() {
        assert_eq!(Duration::minutes(1000).value, 126);
        assert_eq!(Duration::minutes(0).value, 1);
    }
}
