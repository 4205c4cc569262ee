//! Four degree-of-freedom poses: X, Y, Z plus rotation about Z.

use std::fmt;
use std::ops::{Add, Sub};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::length::{Length, LengthUnit};

/// A position plus rotation in some (implied) coordinate frame.
///
/// `x`, `y` and `z` are expressed in `units`; `rotation` is in degrees.
/// Binary operations convert the right-hand side into the left-hand side's
/// units first.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    #[serde(default)]
    pub units: LengthUnit,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl Location {
    pub fn new(units: LengthUnit, x: f64, y: f64, z: f64, rotation: f64) -> Self {
        Self {
            units,
            x,
            y,
            z,
            rotation,
        }
    }

    /// Shorthand for a location in millimeters.
    pub fn mm(x: f64, y: f64, z: f64, rotation: f64) -> Self {
        Self::new(LengthUnit::Millimeters, x, y, z, rotation)
    }

    pub fn length_x(&self) -> Length {
        Length::new(self.x, self.units)
    }

    pub fn length_y(&self) -> Length {
        Length::new(self.y, self.units)
    }

    pub fn length_z(&self) -> Length {
        Length::new(self.z, self.units)
    }

    pub fn convert_to_units(self, units: LengthUnit) -> Self {
        if self.units == units {
            return self;
        }
        Self::new(
            units,
            self.length_x().convert_to_units(units).value(),
            self.length_y().convert_to_units(units).value(),
            self.length_z().convert_to_units(units).value(),
            self.rotation,
        )
    }

    /// Replace individual components, keeping the rest.
    pub fn derive(
        self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        rotation: Option<f64>,
    ) -> Self {
        Self::new(
            self.units,
            x.unwrap_or(self.x),
            y.unwrap_or(self.y),
            z.unwrap_or(self.z),
            rotation.unwrap_or(self.rotation),
        )
    }

    /// Rotate the X/Y components counter-clockwise by `degrees` about the
    /// origin.  The rotation component is advanced by the same angle.
    pub fn rotate_xy(self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(
            self.units,
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
            self.rotation + degrees,
        )
    }

    /// Straight-line XYZ distance to `other`, in `self`'s units.
    pub fn linear_length_to(&self, other: &Location) -> Length {
        let other = other.convert_to_units(self.units);
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        Length::new((dx * dx + dy * dy + dz * dz).sqrt(), self.units)
    }
}

impl Add for Location {
    type Output = Location;

    fn add(self, rhs: Location) -> Location {
        let rhs = rhs.convert_to_units(self.units);
        Location::new(
            self.units,
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
            self.rotation + rhs.rotation,
        )
    }
}

impl Sub for Location {
    type Output = Location;

    fn sub(self, rhs: Location) -> Location {
        let rhs = rhs.convert_to_units(self.units);
        Location::new(
            self.units,
            self.x - rhs.x,
            self.y - rhs.y,
            self.z - rhs.z,
            self.rotation - rhs.rotation,
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, {:.3}) {}",
            self.x, self.y, self.z, self.rotation, self.units
        )
    }
}
