//! [`RoamingGuard`] – automatic safe Z for tools that roam at unsafe Z.
//!
//! A tool whose Z axis is virtual (a camera on a shared head, for instance)
//! never physically moves down, yet its *nominal* Z may be left below safe Z
//! after a user action.  Jogging such a tool around the bed keeps that unsafe
//! Z alive.  The guard remembers where the last user action left the tool
//! and, once the operator has jogged further than the machine's
//! `unsafe_z_roaming_distance` away from there, advises sending the tool to
//! safe Z.

use pnpguard_machine::MachineSnapshot;
use pnpguard_types::{LengthUnit, Location};
use tracing::debug;

/// What the caller should do after a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoamingAdvice {
    Stay,
    MoveToSafeZ,
}

/// Tracks the location of the last non-jog user action.
#[derive(Debug, Clone, Default)]
pub struct RoamingGuard {
    anchor: Option<Location>,
}

impl RoamingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the last user action left the tool, if it was below safe Z.
    pub fn anchor(&self) -> Option<Location> {
        self.anchor
    }

    /// Observe a completed user action on `tool_id`.
    ///
    /// `selected_tool` is the tool the operator had selected *before* this
    /// action and `jogging` tells whether the action was a jog (as opposed to
    /// a "move to" or any other targeted command).  `machine` must reflect the
    /// state after the action.
    pub fn observe(
        &mut self,
        machine: &MachineSnapshot,
        tool_id: &str,
        selected_tool: Option<&str>,
        jogging: bool,
    ) -> RoamingAdvice {
        let Ok(tool) = machine.tool(tool_id) else {
            return RoamingAdvice::Stay;
        };
        if tool.head.is_none() {
            return RoamingAdvice::Stay;
        }

        let location = machine.current_location(tool);
        if machine.is_in_safe_z_zone(tool, location) {
            self.anchor = None;
            return RoamingAdvice::Stay;
        }

        let anchor = match self.anchor {
            Some(anchor) if jogging && selected_tool == Some(tool_id) => anchor,
            _ => {
                self.anchor = Some(location.convert_to_units(LengthUnit::Millimeters));
                return RoamingAdvice::Stay;
            }
        };

        if !machine.has_virtual_z(tool) {
            return RoamingAdvice::Stay;
        }

        let distance = anchor.linear_length_to(&location);
        let limit = machine.settings.unsafe_z_roaming_distance;
        if distance.to_mm() > limit.to_mm() {
            debug!(
                tool = %tool,
                anchor = %anchor,
                location = %location,
                distance = %distance,
                "roamed too far at unsafe Z, going to safe Z"
            );
            self.anchor = None;
            return RoamingAdvice::MoveToSafeZ;
        }
        RoamingAdvice::Stay
    }
}
