//! [`MachineSnapshot`] – an immutable picture of the machine.
//!
//! A snapshot is taken from the live [`MachineRegistry`][crate::MachineRegistry]
//! right before a motion command and handed to the motion rules.  It answers
//! every question the rules ask: which tools share a head, where each tool is
//! now, where it would be after a move, which axes are virtual, where the safe
//! zone lies and which boards are enabled.
//!
//! The same type is the on-disk machine description (TOML) loaded by the CLI.

use pnpguard_types::{GuardError, Length, LengthUnit, Location};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::axis::{AxesLocation, Axis};
use crate::board::BoardLocation;
use crate::tool::{Tool, ToolKind};

fn protection_on() -> bool {
    true
}

fn default_roaming_distance() -> Length {
    Length::mm(10.0)
}

/// Machine-wide safety settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MachineSettings {
    /// When `false` the board protection check always passes.
    #[serde(default = "protection_on")]
    pub board_protection: bool,
    /// How far a tool with a virtual Z may roam at unsafe Z before it is sent
    /// to safe Z.
    #[serde(default = "default_roaming_distance")]
    pub unsafe_z_roaming_distance: Length,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            board_protection: protection_on(),
            unsafe_z_roaming_distance: default_roaming_distance(),
        }
    }
}

/// A carrier for tools that move together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Head {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Immutable view of the whole machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MachineSnapshot {
    #[serde(default)]
    pub settings: MachineSettings,
    #[serde(default)]
    pub heads: Vec<Head>,
    #[serde(default)]
    pub axes: Vec<Axis>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub boards: Vec<BoardLocation>,
}

impl MachineSnapshot {
    /// Check that every tool references a known head and known axes.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] naming the first dangling reference.
    pub fn validate_topology(&self) -> Result<(), GuardError> {
        for tool in &self.tools {
            if let Some(head) = &tool.head
                && self.head(head).is_none()
            {
                return Err(GuardError::Configuration(format!(
                    "tool '{}' references unknown head '{head}'",
                    tool.id
                )));
            }
            for axis in tool.axes.names() {
                if self.axis(axis).is_none() {
                    return Err(GuardError::Configuration(format!(
                        "tool '{}' references unknown axis '{axis}'",
                        tool.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn head(&self, id: &str) -> Option<&Head> {
        self.heads.iter().find(|h| h.id == id)
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.name == name)
    }

    /// Look up a tool by id.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] when no such tool exists.
    pub fn tool(&self, id: &str) -> Result<&Tool, GuardError> {
        self.tools
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| GuardError::Configuration(format!("unknown tool '{id}'")))
    }

    /// The head that owns `tool`.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] when the tool has no head or its head is
    /// not part of this machine.
    pub fn owning_head(&self, tool: &Tool) -> Result<&Head, GuardError> {
        let head_id = tool.head.as_deref().ok_or_else(|| {
            GuardError::Configuration(format!("tool '{}' is not mounted on a head", tool.id))
        })?;
        self.head(head_id).ok_or_else(|| {
            GuardError::Configuration(format!(
                "tool '{}' references unknown head '{head_id}'",
                tool.id
            ))
        })
    }

    /// Every tool mounted on `head_id`, in declaration order.
    pub fn tools_on_head<'a, 'h>(&'a self, head_id: &'h str) -> impl Iterator<Item = &'a Tool> + 'h
    where
        'a: 'h,
    {
        self.tools
            .iter()
            .filter(move |t| t.head.as_deref() == Some(head_id))
    }

    /// Boards that take part in board protection.
    pub fn enabled_boards(&self) -> impl Iterator<Item = &BoardLocation> {
        self.boards.iter().filter(|b| b.enabled)
    }

    /// Where every axis stands right now.
    pub fn current_axes(&self) -> AxesLocation {
        self.axes
            .iter()
            .map(|a| (a.name.clone(), a.coordinate))
            .collect()
    }

    /// The raw pose of the whole machine after moving `tool` to `target`:
    /// current axes overlaid with the axes `tool` drives.
    pub fn hypothetical_axes(&self, tool: &Tool, target: Location) -> AxesLocation {
        self.current_axes().put(&tool.to_raw(target))
    }

    /// Where `tool` is right now (millimeters).
    pub fn current_location(&self, tool: &Tool) -> Location {
        tool.to_tool(&self.current_axes())
    }

    /// Replace every component of `location` that is driven by a virtual axis
    /// with the tool's current value, leaving only physically realisable
    /// coordinates from `location`.
    pub fn physical_location(&self, tool: &Tool, location: Location) -> Location {
        let location = location.convert_to_units(LengthUnit::Millimeters);
        let current = self.current_location(tool);
        let is_virtual = |name: Option<&String>| {
            name.and_then(|n| self.axis(n))
                .is_some_and(|a| a.virtual_axis)
        };
        location.derive(
            is_virtual(Some(&tool.axes.x)).then_some(current.x),
            is_virtual(Some(&tool.axes.y)).then_some(current.y),
            is_virtual(tool.axes.z.as_ref()).then_some(current.z),
            is_virtual(tool.axes.rotation.as_ref()).then_some(current.rotation),
        )
    }

    /// `true` when `tool` standing at `location` has its Z axis inside that
    /// axis' safe zone.  The zone is in raw axis coordinates, so `location`
    /// goes through the tool's transform first.  A tool without a Z axis is
    /// always at safe Z.
    pub fn is_in_safe_z_zone(&self, tool: &Tool, location: Location) -> bool {
        let Some(axis) = tool.axes.z.as_deref().and_then(|name| self.axis(name)) else {
            return true;
        };
        tool.to_raw(location)
            .get(&axis.name)
            .is_none_or(|raw_z| axis.is_in_safe_zone(Length::mm(raw_z)))
    }

    /// Raw coordinates that bring the Z axes of `tools` into their safe
    /// zones.  Axes already inside are left out, so an empty result means
    /// nothing has to move.
    pub fn safe_z_axes<'a>(&self, tools: impl IntoIterator<Item = &'a Tool>) -> AxesLocation {
        let mut axes = AxesLocation::new();
        for tool in tools {
            if let Some(axis) = tool.axes.z.as_deref().and_then(|name| self.axis(name))
                && let Some(entry) = axis.safe_zone_entry()
            {
                axes.set(axis.name.clone(), entry);
            }
        }
        axes
    }

    /// The head's default camera: its first camera.
    pub fn default_camera(&self, head_id: &str) -> Option<&Tool> {
        self.tools_on_head(head_id)
            .find(|t| matches!(t.kind, ToolKind::Camera))
    }

    /// The head's default nozzle: its first nozzle.
    pub fn default_nozzle(&self, head_id: &str) -> Option<&Tool> {
        self.tools_on_head(head_id)
            .find(|t| matches!(t.kind, ToolKind::Nozzle { .. }))
    }

    /// `true` when `tool`'s Z axis exists and is virtual.
    pub fn has_virtual_z(&self, tool: &Tool) -> bool {
        tool.axes
            .z
            .as_deref()
            .and_then(|name| self.axis(name))
            .is_some_and(|a| a.virtual_axis)
    }
}
