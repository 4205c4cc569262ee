//! Tool ↔ raw-axis transform chains.
//!
//! Every tool on a head sees the machine through a short stack of pure
//! transforms: its own head offset, then any machine-level corrections
//! (gantry rotation, non-squareness).  A [`TransformChain`] applies the stages
//! in order to go from tool space towards raw axis space ([`TransformChain::forward`])
//! and applies their inverses in reverse order to come back
//! ([`TransformChain::inverse`]).
//!
//! All stage parameters and results are in millimeters.
//!
//! # Example
//!
//! ```rust
//! use pnpguard_geometry::transform::{AxisTransform, TransformChain};
//! use pnpguard_types::Location;
//!
//! // A nozzle mounted 20 mm to the right of the head reference point.
//! let chain = TransformChain::new()
//!     .then(AxisTransform::HeadOffset { offset: Location::mm(20.0, 0.0, 0.0, 0.0) });
//!
//! let raw = chain.forward(Location::mm(100.0, 50.0, -3.0, 0.0));
//! assert!((raw.x - 80.0).abs() < 1e-9);
//!
//! let back = chain.inverse(raw);
//! assert!((back.x - 100.0).abs() < 1e-9);
//! ```

use pnpguard_types::{LengthUnit, Location};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// AxisTransform
// ────────────────────────────────────────────────────────────────────────────

/// A single invertible stage between tool space and raw axis space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisTransform {
    /// The tool sits at `offset` from the head reference point.  Going towards
    /// raw space subtracts the offset.
    HeadOffset { offset: Location },
    /// The machine frame is rotated by `degrees` about Z relative to raw axes.
    /// Only X/Y are affected; the tool's rotation component passes through.
    RotateXy { degrees: f64 },
    /// Gantry non-squareness: raw X drifts by `factor` per unit of Y.
    NonSquareness { factor: f64 },
}

impl AxisTransform {
    /// Apply this stage in the tool → raw direction.
    pub fn forward(&self, location: Location) -> Location {
        let location = location.convert_to_units(LengthUnit::Millimeters);
        match *self {
            AxisTransform::HeadOffset { offset } => location - offset,
            AxisTransform::RotateXy { degrees } => rotate_keeping_rotation(location, degrees),
            AxisTransform::NonSquareness { factor } => {
                location.derive(Some(location.x + location.y * factor), None, None, None)
            }
        }
    }

    /// Apply this stage in the raw → tool direction.
    pub fn inverse(&self, location: Location) -> Location {
        let location = location.convert_to_units(LengthUnit::Millimeters);
        match *self {
            AxisTransform::HeadOffset { offset } => location + offset,
            AxisTransform::RotateXy { degrees } => rotate_keeping_rotation(location, -degrees),
            AxisTransform::NonSquareness { factor } => {
                location.derive(Some(location.x - location.y * factor), None, None, None)
            }
        }
    }
}

fn rotate_keeping_rotation(location: Location, degrees: f64) -> Location {
    location
        .rotate_xy(degrees)
        .derive(None, None, None, Some(location.rotation))
}

// ────────────────────────────────────────────────────────────────────────────
// TransformChain
// ────────────────────────────────────────────────────────────────────────────

/// An ordered stack of [`AxisTransform`] stages.
///
/// The empty chain is the identity: tool coordinates are raw coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TransformChain {
    stages: Vec<AxisTransform>,
}

impl TransformChain {
    /// Create the identity chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage on the raw side of the chain.
    pub fn then(mut self, stage: AxisTransform) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[AxisTransform] {
        &self.stages
    }

    /// Map a tool-space location to raw-space coordinates (millimeters).
    pub fn forward(&self, location: Location) -> Location {
        self.stages
            .iter()
            .fold(location.convert_to_units(LengthUnit::Millimeters), |acc, stage| {
                stage.forward(acc)
            })
    }

    /// Map raw-space coordinates back to a tool-space location (millimeters).
    pub fn inverse(&self, location: Location) -> Location {
        self.stages
            .iter()
            .rev()
            .fold(location.convert_to_units(LengthUnit::Millimeters), |acc, stage| {
                stage.inverse(acc)
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
