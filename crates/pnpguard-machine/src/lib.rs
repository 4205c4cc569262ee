//! `pnpguard-machine` – machine topology and live state.
//!
//! # Modules
//!
//! - [`axis`] – [`Axis`] definitions (virtual flag, soft limits, safe zone)
//!   and [`AxesLocation`], a pose expressed in raw axis coordinates.
//! - [`tool`] – [`Tool`]s mounted on heads.  Nozzles carry their loaded
//!   [`NozzleTip`] and held [`Part`]; every tool carries its own
//!   [`TransformChain`][pnpguard_geometry::TransformChain].
//! - [`board`] – [`BoardLocation`]: a board fixtured on the machine bed.
//! - [`snapshot`] – [`MachineSnapshot`]: an immutable, serializable picture of
//!   the whole machine, answering topology and tooling queries.
//! - [`registry`] – [`MachineRegistry`]: the live, mutable machine that owns
//!   the [`MotionDriver`] and hands out snapshots.
//! - [`sim`] – [`SimMachine`][sim::SimMachine]: builder for in-process machines
//!   backed by a recording driver, for tests and dry runs.

pub mod axis;
pub mod board;
pub mod registry;
pub mod sim;
pub mod snapshot;
pub mod tool;

pub use axis::{AxesLocation, Axis, AxisKind};
pub use board::BoardLocation;
pub use registry::{MachineRegistry, MotionDriver};
pub use snapshot::{Head, MachineSettings, MachineSnapshot};
pub use tool::{NozzleTip, Part, Tool, ToolAxes, ToolKind};
