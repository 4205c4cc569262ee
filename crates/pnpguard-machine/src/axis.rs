//! Machine axes and raw axis coordinates.

use std::collections::BTreeMap;

use pnpguard_types::Length;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What an axis moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    #[default]
    Linear,
    Rotation,
}

/// A single machine axis.
///
/// Coordinates are millimeters for linear axes and degrees for rotation axes.
/// A *virtual* axis only exists in software (e.g. the Z of a top camera): it
/// has a coordinate but nothing physical moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Axis {
    pub name: String,
    #[serde(default)]
    pub kind: AxisKind,
    #[serde(default, rename = "virtual")]
    pub virtual_axis: bool,
    /// Current coordinate.
    #[serde(default)]
    pub coordinate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_limit_low: Option<Length>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_limit_high: Option<Length>,
    /// Lower bound of the safe zone; unset means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_zone_low: Option<Length>,
    /// Upper bound of the safe zone; unset means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_zone_high: Option<Length>,
}

impl Axis {
    /// A physical linear axis at coordinate 0 with no limits.
    pub fn linear(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Linear,
            virtual_axis: false,
            coordinate: 0.0,
            soft_limit_low: None,
            soft_limit_high: None,
            safe_zone_low: None,
            safe_zone_high: None,
        }
    }

    /// A physical rotation axis at 0°.
    pub fn rotation(name: impl Into<String>) -> Self {
        Self {
            kind: AxisKind::Rotation,
            ..Self::linear(name)
        }
    }

    /// Mark the axis as virtual.
    pub fn virtual_axis(mut self) -> Self {
        self.virtual_axis = true;
        self
    }

    pub fn with_soft_limits(mut self, low: Option<Length>, high: Option<Length>) -> Self {
        self.soft_limit_low = low;
        self.soft_limit_high = high;
        self
    }

    pub fn with_safe_zone(mut self, low: Option<Length>, high: Option<Length>) -> Self {
        self.safe_zone_low = low;
        self.safe_zone_high = high;
        self
    }

    pub fn at(mut self, coordinate: f64) -> Self {
        self.coordinate = coordinate;
        self
    }

    /// `true` when `z` lies within the configured safe zone.  Bounds are
    /// inclusive; a missing bound does not restrict.
    pub fn is_in_safe_zone(&self, z: Length) -> bool {
        let z = z.to_mm();
        let above_low = self.safe_zone_low.is_none_or(|low| z >= low.to_mm());
        let below_high = self.safe_zone_high.is_none_or(|high| z <= high.to_mm());
        above_low && below_high
    }

    /// The coordinate nearest to the current one that lies inside the safe
    /// zone, or `None` when the axis already stands inside it.
    pub fn safe_zone_entry(&self) -> Option<f64> {
        if self.is_in_safe_zone(Length::mm(self.coordinate)) {
            return None;
        }
        let mut target = self.coordinate;
        if let Some(low) = self.safe_zone_low {
            target = target.max(low.to_mm());
        }
        if let Some(high) = self.safe_zone_high {
            target = target.min(high.to_mm());
        }
        Some(target)
    }

    /// Describe how `coordinate` (mm) violates the soft limits, if it does.
    ///
    /// Rotation axes and virtual axes are never limited.
    pub fn soft_limit_violation(&self, coordinate: f64) -> Option<String> {
        if self.virtual_axis || self.kind == AxisKind::Rotation {
            return None;
        }
        if let Some(low) = self.soft_limit_low
            && coordinate < low.to_mm()
        {
            return Some(format!(
                "{coordinate:.3}mm is below the low soft limit {low}"
            ));
        }
        if let Some(high) = self.soft_limit_high
            && coordinate > high.to_mm()
        {
            return Some(format!(
                "{coordinate:.3}mm is above the high soft limit {high}"
            ));
        }
        None
    }
}

/// A machine pose in raw axis coordinates, keyed by axis name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AxesLocation {
    coordinates: BTreeMap<String, f64>,
}

impl AxesLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, axis: &str) -> Option<f64> {
        self.coordinates.get(axis).copied()
    }

    /// Set a single axis coordinate.
    pub fn set(&mut self, axis: impl Into<String>, coordinate: f64) {
        self.coordinates.insert(axis.into(), coordinate);
    }

    /// Overlay every coordinate of `other` onto `self`.  Axes that `other`
    /// does not mention keep their value.
    pub fn put(mut self, other: &AxesLocation) -> Self {
        for (axis, coordinate) in &other.coordinates {
            self.coordinates.insert(axis.clone(), *coordinate);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.coordinates.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

impl FromIterator<(String, f64)> for AxesLocation {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            coordinates: iter.into_iter().collect(),
        }
    }
}
