//! [`MachineRegistry`] – the live machine.
//!
//! The registry owns the mutable machine state (axis coordinates, loaded
//! tips and parts, board enable flags) and the [`MotionDriver`] that actually
//! moves axes.  Motion rules never see the registry; they see the
//! [`MachineSnapshot`] it hands out via [`MachineRegistry::snapshot`].
//!
//! The registry performs no safety checks of its own.  Callers that need the
//! check and the dispatch to observe the same state must hold exclusive access
//! to the registry across both, which is what the kernel's jog gate does.

use pnpguard_types::{GuardError, LengthUnit, Location};
use tracing::{debug, info};

use crate::axis::AxesLocation;
use crate::snapshot::MachineSnapshot;
use crate::tool::{NozzleTip, Part, ToolKind};

/// The motion controller behind the machine.
///
/// Implementations translate a raw axis pose into controller commands.  The
/// registry only updates its own axis state once the driver accepted the move.
pub trait MotionDriver: Send {
    /// Stable identifier, e.g. `"gcode-serial"` or `"sim"`.
    fn id(&self) -> &str;

    /// Move the machine to `axes`.  Axes not mentioned stay where they are.
    ///
    /// # Errors
    ///
    /// [`GuardError::Dispatch`] when the controller refuses or fails the move.
    fn move_to(&mut self, axes: &AxesLocation) -> Result<(), GuardError>;
}

/// The live, mutable machine.
pub struct MachineRegistry {
    machine: MachineSnapshot,
    driver: Box<dyn MotionDriver>,
}

impl MachineRegistry {
    /// Wrap a machine description and a driver.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] when the description has dangling
    /// references.
    pub fn new(machine: MachineSnapshot, driver: Box<dyn MotionDriver>) -> Result<Self, GuardError> {
        machine.validate_topology()?;
        Ok(Self { machine, driver })
    }

    /// An immutable copy of the current machine state.
    pub fn snapshot(&self) -> MachineSnapshot {
        self.machine.clone()
    }

    /// Read access without copying.
    pub fn machine(&self) -> &MachineSnapshot {
        &self.machine
    }

    pub fn driver_id(&self) -> &str {
        self.driver.id()
    }

    /// Move `tool_id` to `target`, driving every axis the tool is mapped to.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] for an unknown tool, or whatever the
    /// driver returns.
    pub fn move_tool(&mut self, tool_id: &str, target: Location) -> Result<(), GuardError> {
        let tool = self.machine.tool(tool_id)?;
        let axes = tool.to_raw(target);
        debug!(tool = tool_id, target = %target, "moving tool");
        self.move_axes(&axes)
    }

    /// Bring the Z axes of every tool on `head_id` into their safe zones.
    /// The zones are raw axis coordinates, so they are written to the axes
    /// directly.  Returns `false` when every axis was already inside.
    pub fn move_head_to_safe_z(&mut self, head_id: &str) -> Result<bool, GuardError> {
        let axes = self.machine.safe_z_axes(self.machine.tools_on_head(head_id));
        if axes.is_empty() {
            return Ok(false);
        }
        debug!(head = head_id, axes = axes.len(), "moving head to safe Z");
        self.move_axes(&axes)?;
        Ok(true)
    }

    /// Bring the Z axis of `tool_id` into its safe zone.  Returns `false`
    /// when it was already there or the tool has no Z axis.
    pub fn move_tool_to_safe_z(&mut self, tool_id: &str) -> Result<bool, GuardError> {
        let tool = self.machine.tool(tool_id)?;
        let axes = self.machine.safe_z_axes([tool]);
        if axes.is_empty() {
            return Ok(false);
        }
        debug!(tool = tool_id, "moving tool to safe Z");
        self.move_axes(&axes)?;
        Ok(true)
    }

    /// Move `tool_id` to `target` by way of safe Z: the whole head goes to
    /// safe Z, then the tool travels in X/Y (and rotation), then Z comes down
    /// to the target.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] for an unknown or unmounted tool, or
    /// whatever the driver returns for the first step it refuses.  Steps that
    /// were accepted before the refusal stay applied.
    pub fn move_tool_at_safe_z(&mut self, tool_id: &str, target: Location) -> Result<(), GuardError> {
        let tool = self.machine.tool(tool_id)?.clone();
        let head_id = self.machine.owning_head(&tool)?.id.clone();
        debug!(tool = tool_id, target = %target, "moving tool at safe Z");

        self.move_head_to_safe_z(&head_id)?;

        let mut travel = AxesLocation::new();
        let mut plunge = AxesLocation::new();
        for (axis, coordinate) in tool.to_raw(target).iter() {
            if tool.axes.z.as_deref() == Some(axis) {
                plunge.set(axis, coordinate);
            } else {
                travel.set(axis, coordinate);
            }
        }
        self.move_axes(&travel)?;
        if !plunge.is_empty() {
            self.move_axes(&plunge)?;
        }
        Ok(())
    }

    /// Hand `axes` to the driver and, on success, record the new coordinates.
    pub fn move_axes(&mut self, axes: &AxesLocation) -> Result<(), GuardError> {
        self.driver.move_to(axes)?;
        for axis in self.machine.axes.iter_mut() {
            if let Some(coordinate) = axes.get(&axis.name) {
                axis.coordinate = coordinate;
            }
        }
        info!(driver = self.driver.id(), axes = axes.len(), "move dispatched");
        Ok(())
    }

    pub fn set_board_protection(&mut self, enabled: bool) {
        self.machine.settings.board_protection = enabled;
    }

    /// Enable or disable a board for board protection.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] when no board has this id.
    pub fn set_board_enabled(&mut self, board_id: &str, enabled: bool) -> Result<(), GuardError> {
        let board = self
            .machine
            .boards
            .iter_mut()
            .find(|b| b.id == board_id)
            .ok_or_else(|| GuardError::Configuration(format!("unknown board '{board_id}'")))?;
        board.enabled = enabled;
        Ok(())
    }

    /// Load `tip` onto a nozzle, replacing any previous tip.
    pub fn load_nozzle_tip(&mut self, nozzle_id: &str, tip: Option<NozzleTip>) -> Result<(), GuardError> {
        let (tip_slot, _) = self.nozzle_slots(nozzle_id)?;
        *tip_slot = tip;
        Ok(())
    }

    /// Record that a nozzle now holds `part` (a pick), or nothing (a place).
    pub fn set_part(&mut self, nozzle_id: &str, part: Option<Part>) -> Result<(), GuardError> {
        let (_, part_slot) = self.nozzle_slots(nozzle_id)?;
        *part_slot = part.map(|p| Part {
            height: p.height.convert_to_units(LengthUnit::Millimeters),
            ..p
        });
        Ok(())
    }

    fn nozzle_slots(
        &mut self,
        nozzle_id: &str,
    ) -> Result<(&mut Option<NozzleTip>, &mut Option<Part>), GuardError> {
        let tool = self
            .machine
            .tools
            .iter_mut()
            .find(|t| t.id == nozzle_id)
            .ok_or_else(|| GuardError::Configuration(format!("unknown tool '{nozzle_id}'")))?;
        match &mut tool.kind {
            ToolKind::Nozzle { tip, part } => Ok((tip, part)),
            other => Err(GuardError::Configuration(format!(
                "tool '{nozzle_id}' is a {}, not a nozzle",
                other.name()
            ))),
        }
    }
}
