//! `pnpguard-types` – shared value types for the pick-and-place motion guard.
//!
//! - [`length`] – [`Length`] and [`LengthUnit`]: unit-tagged scalars.
//! - [`location`] – [`Location`]: X/Y/Z/rotation poses.
//!
//! The crate root holds the error type shared by every other crate and the
//! [`SafetyEvent`] records emitted by the jog gate.

pub mod length;
pub mod location;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use length::{Length, LengthUnit};
pub use location::Location;

/// A record of something the motion guard decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "pnpguard-kernel::jog_gate"
    pub source: String,
    pub payload: SafetyPayload,
}

impl SafetyEvent {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: SafetyPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// What happened to a motion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum SafetyPayload {
    /// The move passed every rule and was handed to the motion driver.
    MoveDispatched { tool: String, target: Location },
    /// The move was refused and never dispatched.
    MoveRejected { tool: String, reason: String },
    /// The tool roamed too far at unsafe Z and was sent to safe Z.
    SafeZRequested { tool: String },
    /// The move itself went out but the follow-up move to safe Z failed; the
    /// tool is still at unsafe Z.
    SafeZFailed { tool: String, reason: String },
    /// Board protection was switched on or off by the operator.
    BoardProtectionChanged { enabled: bool },
}

/// Errors raised by the motion guard.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardError {
    #[error(
        "{tool_description} would potentially crash into board {board_id}. \
         To disable the board protection turn it off in the machine safety settings."
    )]
    CollisionRisk {
        tool_description: String,
        board_id: String,
    },

    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Soft Limit on axis {axis}: {details}")]
    SoftLimit { axis: String, details: String },

    #[error("Invalid length '{0}'")]
    InvalidLength(String),

    #[error("Motion Dispatch Error: {0}")]
    Dispatch(String),
}
