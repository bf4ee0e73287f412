//! Actuator status snapshot
//!
//! The controller answers the `?` query with eight comma-separated
//! fields: `status,error,target,position,eastLimit,westLimit,limitsEnabled,freeRam`.
//! Parsing is all-or-nothing; a malformed reply never yields a partial
//! snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Motion state reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// Motor stopped
    Stopped,
    /// Moving toward the west limit
    MovingWest,
    /// Moving toward the east limit
    MovingEast,
}

impl StatusCode {
    /// Human-readable text, as shown to operators
    pub fn text(self) -> &'static str {
        match self {
            StatusCode::Stopped => "Stopped",
            StatusCode::MovingWest => "Moving west",
            StatusCode::MovingEast => "Moving east",
        }
    }

    fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(StatusCode::Stopped),
            1 => Some(StatusCode::MovingWest),
            2 => Some(StatusCode::MovingEast),
            _ => None,
        }
    }

    fn to_wire(self) -> u8 {
        match self {
            StatusCode::Stopped => 0,
            StatusCode::MovingWest => 1,
            StatusCode::MovingEast => 2,
        }
    }
}

/// Fault condition reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No fault
    None,
    /// Position counter lost (e.g. after a power glitch)
    PositionLost,
    /// Stopped at the east limit
    EastLimit,
    /// Stopped at the west limit
    WestLimit,
    /// Commanded to move but no encoder pulses arrived
    NoPulses,
}

impl ErrorCode {
    /// Human-readable text, as shown to operators
    pub fn text(self) -> &'static str {
        match self {
            ErrorCode::None => "No error",
            ErrorCode::PositionLost => "Position lost",
            ErrorCode::EastLimit => "East limit",
            ErrorCode::WestLimit => "West limit",
            ErrorCode::NoPulses => "Not moving (no pulses)",
        }
    }

    fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(ErrorCode::None),
            1 => Some(ErrorCode::PositionLost),
            2 => Some(ErrorCode::EastLimit),
            3 => Some(ErrorCode::WestLimit),
            4 => Some(ErrorCode::NoPulses),
            _ => None,
        }
    }

    fn to_wire(self) -> u8 {
        match self {
            ErrorCode::None => 0,
            ErrorCode::PositionLost => 1,
            ErrorCode::EastLimit => 2,
            ErrorCode::WestLimit => 3,
            ErrorCode::NoPulses => 4,
        }
    }
}

/// Error parsing a status reply
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StatusParseError {
    /// Wrong number of comma-separated fields
    #[error("Expected 8 status fields, got {0}")]
    FieldCount(usize),

    /// A field did not parse as the expected type
    #[error("Invalid value '{value}' for field '{field}'")]
    FieldValue {
        /// Field name
        field: &'static str,
        /// Offending wire text
        value: String,
    },
}

/// Immutable snapshot of the controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorStatus {
    /// Motion state
    pub status: StatusCode,
    /// Fault condition
    pub error: ErrorCode,
    /// Commanded target position
    pub target: i64,
    /// Current position
    pub position: i64,
    /// East soft-limit position
    pub east_limit: i64,
    /// West soft-limit position
    pub west_limit: i64,
    /// Whether the soft limits are enforced
    pub limits_enabled: bool,
    /// Free RAM on the controller, bytes (diagnostic)
    pub free_memory: i64,
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, StatusParseError> {
    value.trim().parse().map_err(|_| StatusParseError::FieldValue {
        field,
        value: value.to_string(),
    })
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, StatusParseError> {
    match value.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(StatusParseError::FieldValue {
            field,
            value: other.to_string(),
        }),
    }
}

impl FromStr for ActuatorStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(',').collect();
        if fields.len() != 8 {
            return Err(StatusParseError::FieldCount(fields.len()));
        }

        let status_raw = parse_int("status", fields[0])?;
        let status = u8::try_from(status_raw)
            .ok()
            .and_then(StatusCode::from_wire)
            .ok_or_else(|| StatusParseError::FieldValue {
                field: "status",
                value: fields[0].to_string(),
            })?;

        let error_raw = parse_int("error", fields[1])?;
        let error = u8::try_from(error_raw)
            .ok()
            .and_then(ErrorCode::from_wire)
            .ok_or_else(|| StatusParseError::FieldValue {
                field: "error",
                value: fields[1].to_string(),
            })?;

        Ok(ActuatorStatus {
            status,
            error,
            target: parse_int("target", fields[2])?,
            position: parse_int("position", fields[3])?,
            east_limit: parse_int("eastLimit", fields[4])?,
            west_limit: parse_int("westLimit", fields[5])?,
            limits_enabled: parse_bool("limitsEnabled", fields[6])?,
            free_memory: parse_int("freeRam", fields[7])?,
        })
    }
}

impl fmt::Display for ActuatorStatus {
    /// Renders the wire form the controller itself would send
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{}",
            self.status.to_wire(),
            self.error.to_wire(),
            self.target,
            self.position,
            self.east_limit,
            self.west_limit,
            u8::from(self.limits_enabled),
            self.free_memory,
        )
    }
}
