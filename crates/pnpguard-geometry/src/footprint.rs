//! Board footprints and the board-local frame.
//!
//! A board is placed with its origin corner at `origin` (machine coordinates,
//! including the board's rotation) and extends `width` along its local +X and
//! `length` along its local +Y.  A point is expressed in the board-local frame
//! by subtracting the origin and rotating by the negative board rotation.
//!
//! The containment test is a rectangle grown outward by a margin on all four
//! sides.  It approximates a circular clearance around the tool and is not a
//! swept-volume check.

use pnpguard_types::{Length, LengthUnit, Location};

/// Outline of one fixtured board in machine space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardFootprint {
    /// Board origin corner and rotation in machine coordinates.
    pub origin: Location,
    /// Board extent along its local X.
    pub width: Length,
    /// Board extent along its local Y.
    pub length: Length,
}

impl BoardFootprint {
    pub fn new(origin: Location, width: Length, length: Length) -> Self {
        Self {
            origin,
            width,
            length,
        }
    }

    /// Express a machine-space `point` in this board's local frame
    /// (millimeters).
    pub fn to_local(&self, point: Location) -> Location {
        let origin = self.origin.convert_to_units(LengthUnit::Millimeters);
        (point.convert_to_units(LengthUnit::Millimeters) - origin).rotate_xy(-origin.rotation)
    }

    /// `true` when `point` is clear of the board: outside the footprint grown
    /// by `margin` on at least one side, or above the board surface.
    ///
    /// Points exactly on the grown edge count as clear.  A point exactly at
    /// the board surface height (local Z == 0) is *not* above it.
    pub fn is_clear(&self, point: Location, margin: Length) -> bool {
        let local = self.to_local(point);
        let m = margin.to_mm();
        let width = self.width.to_mm();
        let length = self.length.to_mm();

        local.x <= -m
            || local.y <= -m
            || local.x >= width + m
            || local.y >= length + m
            || local.z > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_100(origin: Location) -> BoardFootprint {
        BoardFootprint::new(origin, Length::mm(100.0), Length::mm(100.0))
    }

    #[test]
    fn point_inside_below_surface_is_not_clear() {
        let b = board_100(Location::mm(0.0, 0.0, 0.0, 0.0));
        assert!(!b.is_clear(Location::mm(50.0, 50.0, -5.0, 0.0), Length::mm(1.0)));
    }

    #[test]
    fn point_far_outside_is_clear() {
        let b = board_100(Location::mm(0.0, 0.0, 0.0, 0.0));
        assert!(b.is_clear(Location::mm(200.0, 200.0, -5.0, 0.0), Length::mm(1.0)));
    }

    #[test]
    fn point_above_surface_is_clear() {
        let b = board_100(Location::mm(0.0, 0.0, 0.0, 0.0));
        assert!(b.is_clear(Location::mm(50.0, 50.0, 0.1, 0.0), Length::mm(1.0)));
    }

    #[test]
    fn point_at_surface_height_is_not_clear() {
        let b = board_100(Location::mm(0.0, 0.0, -2.0, 0.0));
        assert!(!b.is_clear(Location::mm(50.0, 50.0, -2.0, 0.0), Length::mm(1.0)));
    }

    #[test]
    fn margin_band_is_not_clear() {
        let b = board_100(Location::mm(0.0, 0.0, 0.0, 0.0));
        // 1 mm outside the raw outline, margin 1.75 mm.
        assert!(!b.is_clear(Location::mm(-1.0, 50.0, -1.0, 0.0), Length::mm(1.75)));
        assert!(!b.is_clear(Location::mm(101.0, 50.0, -1.0, 0.0), Length::mm(1.75)));
        // Same point with no margin at all is clear.
        assert!(b.is_clear(Location::mm(-1.0, 50.0, -1.0, 0.0), Length::zero()));
    }

    #[test]
    fn grown_edge_counts_as_clear() {
        let b = board_100(Location::mm(0.0, 0.0, 0.0, 0.0));
        assert!(b.is_clear(Location::mm(-1.0, 50.0, -1.0, 0.0), Length::mm(1.0)));
        assert!(b.is_clear(Location::mm(50.0, 101.0, -1.0, 0.0), Length::mm(1.0)));
    }

    #[test]
    fn local_frame_follows_board_rotation() {
        // Board rotated 90°: its local +X points along machine +Y.
        let b = BoardFootprint::new(
            Location::mm(10.0, 10.0, 0.0, 90.0),
            Length::mm(50.0),
            Length::mm(20.0),
        );
        let local = b.to_local(Location::mm(10.0, 40.0, 0.0, 0.0));
        assert!((local.x - 30.0).abs() < 1e-9);
        assert!(local.y.abs() < 1e-9);

        // Inside the rotated outline…
        assert!(!b.is_clear(Location::mm(5.0, 40.0, -1.0, 0.0), Length::mm(1.0)));
        // …but outside the unrotated one.
        assert!(b.is_clear(Location::mm(40.0, 15.0, -1.0, 0.0), Length::mm(1.0)));
    }

    #[test]
    fn verdict_is_rotation_invariant() {
        let margin = Length::mm(1.0);
        let local_points = [
            Location::mm(30.0, 30.0, -1.0, 0.0),
            Location::mm(-0.5, 10.0, -1.0, 0.0),
            Location::mm(120.0, 10.0, -1.0, 0.0),
            Location::mm(50.0, 50.0, 1.0, 0.0),
        ];
        let base = board_100(Location::mm(20.0, 30.0, 0.0, 0.0));
        for angle in [0.0, 17.0, 90.0, 180.0, 271.5] {
            let rotated = board_100(Location::mm(20.0, 30.0, 0.0, angle));
            for p in local_points {
                // Re-express the same board-local point in machine space.
                let machine = p.rotate_xy(angle) + Location::mm(20.0, 30.0, 0.0, 0.0);
                let unrotated_machine = p + Location::mm(20.0, 30.0, 0.0, 0.0);
                assert_eq!(
                    rotated.is_clear(machine, margin),
                    base.is_clear(unrotated_machine, margin),
                    "angle {angle}, point {p}"
                );
            }
        }
    }

    #[test]
    fn units_are_normalized() {
        let b = BoardFootprint::new(
            Location::new(LengthUnit::Inches, 0.0, 0.0, 0.0, 0.0),
            Length::new(1.0, LengthUnit::Inches),
            Length::new(1.0, LengthUnit::Inches),
        );
        assert!(!b.is_clear(Location::mm(20.0, 20.0, -1.0, 0.0), Length::mm(1.0)));
        assert!(b.is_clear(Location::mm(27.0, 20.0, -1.0, 0.0), Length::mm(1.0)));
    }
}
