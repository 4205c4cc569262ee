//! `pnpguard-geometry` – coordinate frames for the motion guard.
//!
//! # Modules
//!
//! - [`transform`] – [`TransformChain`][transform::TransformChain]: an ordered
//!   stack of [`AxisTransform`][transform::AxisTransform] stages that maps a
//!   tool location into raw axis coordinates and back.
//! - [`footprint`] – [`BoardFootprint`][footprint::BoardFootprint]: a
//!   rectangular board outline placed in machine space, with the board-local
//!   frame and the expanded-rectangle containment test used for board
//!   protection.

pub mod footprint;
pub mod transform;

pub use footprint::BoardFootprint;
pub use transform::{AxisTransform, TransformChain};
