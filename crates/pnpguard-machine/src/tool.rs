//! Head-mounted tools: nozzles, cameras and actuators.
//!
//! A tool knows which axes position it ([`ToolAxes`]) and how its own
//! coordinates relate to those axes ([`TransformChain`]).  Only nozzles carry
//! extra tooling state: the loaded [`NozzleTip`] and the held [`Part`].

use std::fmt;

use pnpguard_geometry::TransformChain;
use pnpguard_types::{Length, Location};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::axis::AxesLocation;

/// Physical tip geometry on a nozzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NozzleTip {
    pub name: String,
    /// Outer diameter of the tip at its lower end.
    pub diameter_low: Length,
    /// Largest part diameter the tip is rated to carry.
    pub max_part_diameter: Length,
}

/// A component currently held on a nozzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Part {
    pub id: String,
    pub height: Length,
}

/// What kind of device a tool is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolKind {
    Nozzle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tip: Option<NozzleTip>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        part: Option<Part>,
    },
    Camera,
    Actuator,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Nozzle { .. } => "Nozzle",
            ToolKind::Camera => "Camera",
            ToolKind::Actuator => "Actuator",
        }
    }
}

/// Names of the axes that position a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolAxes {
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<String>,
}

impl ToolAxes {
    pub fn new(x: &str, y: &str, z: Option<&str>, rotation: Option<&str>) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
            z: z.map(str::to_string),
            rotation: rotation.map(str::to_string),
        }
    }

    /// Every mapped axis name.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        [Some(&self.x), Some(&self.y), self.z.as_ref(), self.rotation.as_ref()]
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// A device positioned by a head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Tool {
    pub id: String,
    pub name: String,
    /// Owning head.  Tools without a head (e.g. bottom cameras) cannot be
    /// jogged through the guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    pub kind: ToolKind,
    pub axes: ToolAxes,
    #[serde(default)]
    pub transform: TransformChain,
}

impl Tool {
    /// Raw axis coordinates that put this tool at `location`.
    pub fn to_raw(&self, location: Location) -> AxesLocation {
        let raw = self.transform.forward(location);
        let mut axes = AxesLocation::new();
        axes.set(self.axes.x.clone(), raw.x);
        axes.set(self.axes.y.clone(), raw.y);
        if let Some(z) = &self.axes.z {
            axes.set(z.clone(), raw.z);
        }
        if let Some(rotation) = &self.axes.rotation {
            axes.set(rotation.clone(), raw.rotation);
        }
        axes
    }

    /// This tool's location (millimeters) when the machine axes stand at
    /// `axes`.  Unmapped or unknown axes read as 0.
    pub fn to_tool(&self, axes: &AxesLocation) -> Location {
        let read = |name: Option<&String>| name.and_then(|n| axes.get(n)).unwrap_or(0.0);
        let raw = Location::mm(
            read(Some(&self.axes.x)),
            read(Some(&self.axes.y)),
            read(self.axes.z.as_ref()),
            read(self.axes.rotation.as_ref()),
        );
        self.transform.inverse(raw)
    }

    pub fn nozzle_tip(&self) -> Option<&NozzleTip> {
        match &self.kind {
            ToolKind::Nozzle { tip, .. } => tip.as_ref(),
            _ => None,
        }
    }

    pub fn part(&self) -> Option<&Part> {
        match &self.kind {
            ToolKind::Nozzle { part, .. } => part.as_ref(),
            _ => None,
        }
    }
}

/// Operator-facing description: `"Nozzle N1 with 502 holding R0805"`.
impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.name(), self.name)?;
        if let Some(tip) = self.nozzle_tip() {
            write!(f, " with {}", tip.name)?;
        }
        if let Some(part) = self.part() {
            write!(f, " holding {}", part.id)?;
        }
        Ok(())
    }
}
