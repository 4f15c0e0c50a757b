//! Event kind enum as the single source of truth for event kind strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle transitions recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Stop,
    Finish,
    Acknowledge,
}

impl EventKind {
    pub const ALL: [Self; 4] = [Self::Start, Self::Stop, Self::Finish, Self::Acknowledge];

    /// String representation for storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Finish => "finish",
            Self::Acknowledge => "acknowledge",
        }
    }

    /// Whether this kind ends the countdown.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stop | Self::Finish)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "finish" => Ok(Self::Finish),
            "acknowledge" => Ok(Self::Acknowledge),
            _ => Err(UnknownEventKind(s.to_string())),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event kind strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_variants() {
        for variant in &EventKind::ALL {
            let s = variant.to_string();
            let parsed: EventKind = s.parse().expect("should parse");
            assert_eq!(parsed, *variant, "roundtrip failed for {variant:?}");
        }
    }

    #[test]
    fn only_stop_and_finish_are_terminal() {
        assert!(!EventKind::Start.is_terminal());
        assert!(EventKind::Stop.is_terminal());
        assert!(EventKind::Finish.is_terminal());
        assert!(!EventKind::Acknowledge.is_terminal());
    }

    #[test]
    fn unknown_kind_errors() {
        let err = "pause".parse::<EventKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown event kind: pause");
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("Start".parse::<EventKind>().is_err());
    }
}
