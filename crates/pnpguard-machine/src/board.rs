//! Boards fixtured on the machine bed.

use pnpguard_geometry::BoardFootprint;
use pnpguard_types::Location;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn enabled_by_default() -> bool {
    true
}

/// A board placed in machine space.
///
/// `origin` is the global location of the board's origin corner, including
/// its rotation.  `dimensions.x` is the board width, `dimensions.y` its length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoardLocation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub origin: Location,
    pub dimensions: Location,
    /// Disabled boards are ignored by board protection.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl BoardLocation {
    pub fn new(id: impl Into<String>, origin: Location, dimensions: Location) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            origin,
            dimensions,
            enabled: true,
        }
    }

    pub fn footprint(&self) -> BoardFootprint {
        BoardFootprint::new(
            self.origin,
            self.dimensions.length_x(),
            self.dimensions.length_y(),
        )
    }
}
