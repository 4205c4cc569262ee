//! In-process simulated machines for tests and dry runs.
//!
//! [`SimDriver`] is a [`MotionDriver`] that records every move it is asked to
//! perform.  [`SimMachine`] is a builder for [`MachineSnapshot`]s and
//! [`MachineRegistry`]s, with a ready-made single-head layout.
//!
//! # Example
//!
//! ```rust
//! use pnpguard_machine::sim::SimMachine;
//! use pnpguard_types::Location;
//!
//! let mut registry = SimMachine::single_head()
//!     .with_board("b1", Location::mm(0.0, 0.0, 0.0, 0.0), 100.0, 100.0)
//!     .build()
//!     .expect("sim machine is well-formed");
//!
//! registry
//!     .move_tool("n1", Location::mm(200.0, 200.0, 0.0, 0.0))
//!     .expect("sim move must succeed");
//! ```

use std::sync::{Arc, Mutex};

use pnpguard_geometry::{AxisTransform, TransformChain};
use pnpguard_types::{GuardError, Length, Location};

use crate::axis::{AxesLocation, Axis};
use crate::board::BoardLocation;
use crate::registry::{MachineRegistry, MotionDriver};
use crate::snapshot::{Head, MachineSnapshot};
use crate::tool::{Tool, ToolAxes, ToolKind};

// ────────────────────────────────────────────────────────────────────────────
// SimDriver
// ────────────────────────────────────────────────────────────────────────────

/// Shared view of the moves a [`SimDriver`] received.
#[derive(Debug, Clone, Default)]
pub struct MoveLog(Arc<Mutex<Vec<AxesLocation>>>);

impl MoveLog {
    /// Every accepted move, oldest first.
    pub fn moves(&self) -> Vec<AxesLocation> {
        match self.0.lock() {
            Ok(moves) => moves.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// A simulated motion controller.
pub struct SimDriver {
    log: MoveLog,
    /// Moves accepted before the driver starts refusing; `None` accepts all.
    accept_limit: Option<usize>,
}

impl SimDriver {
    /// A driver that accepts every move.
    pub fn recording() -> (Box<Self>, MoveLog) {
        let log = MoveLog::default();
        (
            Box::new(Self {
                log: log.clone(),
                accept_limit: None,
            }),
            log,
        )
    }

    /// A driver that refuses every move, as a controller in an alarm state
    /// would.
    pub fn refusing() -> (Box<Self>, MoveLog) {
        Self::refusing_after(0)
    }

    /// A driver that accepts `accepted` moves and refuses everything after,
    /// like a controller that alarms in the middle of a sequence.
    pub fn refusing_after(accepted: usize) -> (Box<Self>, MoveLog) {
        let (mut driver, log) = Self::recording();
        driver.accept_limit = Some(accepted);
        (driver, log)
    }
}

impl MotionDriver for SimDriver {
    fn id(&self) -> &str {
        "sim"
    }

    fn move_to(&mut self, axes: &AxesLocation) -> Result<(), GuardError> {
        let mut moves = self
            .log
            .0
            .lock()
            .map_err(|_| GuardError::Dispatch("sim move log poisoned".to_string()))?;
        if self.accept_limit.is_some_and(|limit| moves.len() >= limit) {
            return Err(GuardError::Dispatch("sim driver is refusing moves".to_string()));
        }
        moves.push(axes.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimMachine builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for simulated machines.
#[derive(Debug, Clone, Default)]
pub struct SimMachine {
    machine: MachineSnapshot,
}

impl SimMachine {
    /// An empty machine with default settings.
    pub fn builder() -> Self {
        Self::default()
    }

    /// One head `h1` with:
    ///
    /// | Tool | Kind | Axes | Offset |
    /// |---|---|---|---|
    /// | `n1` | nozzle, no tip | `x y z c` | none |
    /// | `cam` | camera | `x y zc` (virtual) | 30 mm left of the nozzle |
    ///
    /// `z` has its safe zone at Z ≥ 0 mm.  Every axis starts at 0, so the
    /// nozzle starts at safe Z.
    pub fn single_head() -> Self {
        Self::builder()
            .with_head("h1")
            .with_axis(Axis::linear("x"))
            .with_axis(Axis::linear("y"))
            .with_axis(Axis::linear("z").with_safe_zone(Some(Length::zero()), None))
            .with_axis(Axis::rotation("c"))
            .with_axis(Axis::linear("zc").virtual_axis())
            .with_tool(Tool {
                id: "n1".into(),
                name: "N1".into(),
                head: Some("h1".into()),
                kind: ToolKind::Nozzle {
                    tip: None,
                    part: None,
                },
                axes: ToolAxes::new("x", "y", Some("z"), Some("c")),
                transform: TransformChain::new(),
            })
            .with_tool(Tool {
                id: "cam".into(),
                name: "Top".into(),
                head: Some("h1".into()),
                kind: ToolKind::Camera,
                axes: ToolAxes::new("x", "y", Some("zc"), None),
                transform: TransformChain::new().then(AxisTransform::HeadOffset {
                    offset: Location::mm(-30.0, 0.0, 0.0, 0.0),
                }),
            })
    }

    pub fn with_head(mut self, id: &str) -> Self {
        self.machine.heads.push(Head {
            id: id.to_string(),
            name: id.to_uppercase(),
        });
        self
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.machine.axes.retain(|a| a.name != axis.name);
        self.machine.axes.push(axis);
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.machine.tools.retain(|t| t.id != tool.id);
        self.machine.tools.push(tool);
        self
    }

    /// Add an enabled board of `width` × `length` millimeters.
    pub fn with_board(mut self, id: &str, origin: Location, width: f64, length: f64) -> Self {
        self.machine.boards.push(BoardLocation::new(
            id,
            origin,
            Location::mm(width, length, 0.0, 0.0),
        ));
        self
    }

    pub fn board_protection(mut self, enabled: bool) -> Self {
        self.machine.settings.board_protection = enabled;
        self
    }

    /// Mutate the machine under construction directly.
    pub fn tweak(mut self, f: impl FnOnce(&mut MachineSnapshot)) -> Self {
        f(&mut self.machine);
        self
    }

    pub fn build_snapshot(self) -> MachineSnapshot {
        self.machine
    }

    /// Build a live registry backed by an accepting [`SimDriver`].
    pub fn build(self) -> Result<MachineRegistry, GuardError> {
        let (driver, _) = SimDriver::recording();
        MachineRegistry::new(self.machine, driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_head_layout_is_valid() {
        let m = SimMachine::single_head().build_snapshot();
        assert!(m.validate_topology().is_ok());
        assert_eq!(m.tools_on_head("h1").count(), 2);
        assert!(m.axis("zc").unwrap().virtual_axis);
    }

    #[test]
    fn with_axis_replaces_same_name() {
        let m = SimMachine::single_head()
            .with_axis(Axis::linear("z").at(7.0))
            .build_snapshot();
        assert_eq!(m.axes.iter().filter(|a| a.name == "z").count(), 1);
        assert_eq!(m.axis("z").unwrap().coordinate, 7.0);
    }

    #[test]
    fn sim_driver_records_moves() {
        let (mut driver, log) = SimDriver::recording();
        let mut axes = AxesLocation::new();
        axes.set("x", 1.0);
        driver.move_to(&axes).unwrap();
        driver.move_to(&axes).unwrap();
        assert_eq!(log.moves().len(), 2);
        assert_eq!(driver.id(), "sim");
    }

    #[test]
    fn refusing_driver_errors() {
        let (mut driver, log) = SimDriver::refusing();
        assert!(driver.move_to(&AxesLocation::new()).is_err());
        assert!(log.moves().is_empty());
    }

    #[test]
    fn refusing_after_accepts_then_refuses() {
        let (mut driver, log) = SimDriver::refusing_after(1);
        assert!(driver.move_to(&AxesLocation::new()).is_ok());
        assert!(matches!(driver.move_to(&AxesLocation::new()), Err(GuardError::Dispatch(_))));
        assert_eq!(log.moves().len(), 1);
    }

    #[test]
    fn poisoned_log_still_reports_moves() {
        let (mut driver, log) = SimDriver::recording();
        driver.move_to(&AxesLocation::new()).unwrap();
        let shared = log.clone();
        let _ = std::thread::spawn(move || {
            let _held = shared.0.lock().unwrap();
            panic!("poison the move log");
        })
        .join();
        assert!(log.0.is_poisoned());
        assert_eq!(log.moves().len(), 1);
    }

    #[test]
    fn build_rejects_dangling_references() {
        let result = SimMachine::single_head()
            .tweak(|m| m.tools[0].head = Some("h9".into()))
            .build();
        assert!(matches!(result, Err(GuardError::Configuration(_))));
    }
}
