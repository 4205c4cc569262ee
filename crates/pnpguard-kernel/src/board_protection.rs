//! Board protection – keeps head-mounted tools out of fixtured boards.
//!
//! [`validate`] answers one question: if `tool` were moved to `target`, would
//! any tool on the same head end up inside the footprint of an enabled board,
//! grown by that tool's safe distance, at or below the board surface?
//!
//! The check works on an immutable [`MachineSnapshot`] and never mutates it.
//! It is deterministic: the same snapshot and target always yield the same
//! verdict.

use std::cmp::Ordering;

use pnpguard_machine::{MachineSnapshot, Tool};
use pnpguard_types::{GuardError, Length, Location};
use tracing::{debug, warn};

use crate::verifier::{MotionRule, MoveRequest};

/// Clearance every tool keeps from a board edge regardless of tooling.
const BASE_CLEARANCE_MM: f64 = 1.0;

/// The clearance margin for `tool` (millimeters).
///
/// | Tooling | Margin |
/// |---|---|
/// | no tip | 1 mm |
/// | tip, no part | 1 mm + `diameter_low / 2` |
/// | tip + part, `max_part_diameter > diameter_low` | 1 mm + `max_part_diameter / 2` |
/// | tip + part, otherwise | 1 mm + `diameter_low / 2` |
pub fn safe_distance(tool: &Tool) -> Length {
    let base = Length::mm(BASE_CLEARANCE_MM);
    match (tool.nozzle_tip(), tool.part()) {
        (Some(tip), Some(_))
            if tip.max_part_diameter.compare(&tip.diameter_low) == Ordering::Greater =>
        {
            base + tip.max_part_diameter * 0.5
        }
        (Some(tip), _) => base + tip.diameter_low * 0.5,
        (None, _) => base,
    }
}

/// Check whether moving `tool_id` to `target` keeps every tool on its head
/// clear of every enabled board.
///
/// # Errors
///
/// - [`GuardError::CollisionRisk`] naming the first offending tool and board.
/// - [`GuardError::Configuration`] when the tool is unknown or not mounted on
///   a head.
///
/// # Example
///
/// ```
/// use pnpguard_kernel::validate;
/// use pnpguard_machine::sim::SimMachine;
/// use pnpguard_types::{GuardError, Location};
///
/// let machine = SimMachine::single_head()
///     .with_board("b1", Location::mm(0.0, 0.0, 0.0, 0.0), 100.0, 100.0)
///     .build_snapshot();
///
/// let over_board = Location::mm(50.0, 50.0, -5.0, 0.0);
/// assert!(matches!(
///     validate(&machine, "n1", &over_board),
///     Err(GuardError::CollisionRisk { .. })
/// ));
/// ```
pub fn validate(machine: &MachineSnapshot, tool_id: &str, target: &Location) -> Result<(), GuardError> {
    if !machine.settings.board_protection {
        return Ok(());
    }

    let tool = machine.tool(tool_id)?;
    let head = machine.owning_head(tool)?;
    let raw = machine.hypothetical_axes(tool, *target);

    for hm in machine.tools_on_head(&head.id) {
        let mut location = hm.to_tool(&raw);
        let margin = safe_distance(hm);
        if let Some(part) = hm.part() {
            location.z -= part.height.to_mm();
        }
        let location = machine.physical_location(hm, location);

        if machine.is_in_safe_z_zone(hm, location) {
            debug!(tool = %hm, z = location.z, "tool at safe Z, skipping board check");
            continue;
        }

        for board in machine.enabled_boards() {
            if !board.footprint().is_clear(location, margin) {
                warn!(
                    tool = %hm,
                    board = %board.id,
                    location = %location,
                    margin = %margin,
                    "move rejected by board protection"
                );
                return Err(GuardError::CollisionRisk {
                    tool_description: hm.to_string(),
                    board_id: board.id.clone(),
                });
            }
            debug!(tool = %hm, board = %board.id, "clear of board");
        }
    }
    Ok(())
}

/// [`MotionRule`] adapter around [`validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardProtectionRule;

impl MotionRule for BoardProtectionRule {
    fn name(&self) -> &str {
        "board_protection"
    }

    fn check(&self, machine: &MachineSnapshot, request: &MoveRequest) -> Result<(), GuardError> {
        validate(machine, &request.tool_id, &request.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnpguard_machine::sim::SimMachine;
    use pnpguard_geometry::{AxisTransform, TransformChain};
    use pnpguard_machine::{Axis, NozzleTip, Part, ToolKind};
    use pnpguard_types::LengthUnit;

    fn board_at_origin() -> SimMachine {
        SimMachine::single_head().with_board("b1", Location::mm(0.0, 0.0, 0.0, 0.0), 100.0, 100.0)
    }

    fn tip(diameter_low: f64, max_part_diameter: f64) -> NozzleTip {
        NozzleTip {
            name: "502".into(),
            diameter_low: Length::mm(diameter_low),
            max_part_diameter: Length::mm(max_part_diameter),
        }
    }

    fn part(height: f64) -> Part {
        Part {
            id: "R0805".into(),
            height: Length::mm(height),
        }
    }

    fn with_nozzle_tooling(tip: Option<NozzleTip>, part: Option<Part>) -> impl FnOnce(&mut MachineSnapshot) {
        move |m| {
            if let Some(nozzle) = m.tools.iter_mut().find(|t| t.id == "n1") {
                nozzle.kind = ToolKind::Nozzle { tip, part };
            }
        }
    }

    // ── safe distance ────────────────────────────────────────────────────────

    #[test]
    fn safe_distance_follows_tooling() {
        let cases = [
            (None, None, 1.0),
            (Some(tip(1.5, 1.0)), None, 1.75),
            (Some(tip(1.5, 4.0)), Some(part(0.5)), 3.0),
            (Some(tip(1.5, 1.0)), Some(part(0.5)), 1.75),
            (None, Some(part(0.5)), 1.0),
        ];
        for (t, p, expected) in cases {
            let m = board_at_origin()
                .tweak(with_nozzle_tooling(t, p))
                .build_snapshot();
            let margin = safe_distance(m.tool("n1").unwrap());
            assert!((margin.to_mm() - expected).abs() < 1e-9, "expected {expected}, got {margin}");
        }
    }

    #[test]
    fn camera_margin_is_the_base_clearance() {
        let m = board_at_origin().build_snapshot();
        assert_eq!(safe_distance(m.tool("cam").unwrap()), Length::mm(1.0));
    }

    // ── scenarios ────────────────────────────────────────────────────────────

    #[test]
    fn nozzle_over_board_below_surface_is_rejected() {
        let m = board_at_origin().build_snapshot();
        let err = validate(&m, "n1", &Location::mm(50.0, 50.0, -5.0, 0.0)).unwrap_err();
        assert_eq!(
            err,
            GuardError::CollisionRisk {
                tool_description: "Nozzle N1".into(),
                board_id: "b1".into(),
            }
        );
    }

    #[test]
    fn nozzle_far_from_board_is_accepted() {
        let m = board_at_origin().build_snapshot();
        assert!(validate(&m, "n1", &Location::mm(200.0, 200.0, -5.0, 0.0)).is_ok());
    }

    #[test]
    fn nozzle_above_safe_z_is_accepted_anywhere() {
        let m = board_at_origin().build_snapshot();
        for (x, y) in [(50.0, 50.0), (0.0, 0.0), (100.0, 100.0), (-0.5, 50.0)] {
            assert!(validate(&m, "n1", &Location::mm(x, y, 5.0, 0.0)).is_ok());
        }
    }

    #[test]
    fn tip_margin_catches_points_just_outside_the_board() {
        let m = board_at_origin()
            .tweak(with_nozzle_tooling(Some(tip(1.5, 1.0)), None))
            .build_snapshot();
        let result = validate(&m, "n1", &Location::mm(-1.0, 50.0, -5.0, 0.0));
        assert!(matches!(result, Err(GuardError::CollisionRisk { .. })));

        let result = validate(&m, "n1", &Location::mm(-1.75, 50.0, -5.0, 0.0));
        assert!(result.is_ok(), "a point on the grown edge is clear");
    }

    #[test]
    fn disabled_protection_accepts_everything() {
        let m = board_at_origin().board_protection(false).build_snapshot();
        assert!(validate(&m, "n1", &Location::mm(50.0, 50.0, -5.0, 0.0)).is_ok());
    }

    // ── properties ───────────────────────────────────────────────────────────

    #[test]
    fn validation_is_deterministic() {
        let m = board_at_origin().build_snapshot();
        let before = m.clone();
        let target = Location::mm(50.0, 50.0, -5.0, 0.0);
        let first = validate(&m, "n1", &target);
        let second = validate(&m, "n1", &target);
        assert_eq!(first, second);
        assert_eq!(m, before);
    }

    #[test]
    fn no_enabled_boards_means_no_risk() {
        let empty = SimMachine::single_head().build_snapshot();
        assert!(validate(&empty, "n1", &Location::mm(50.0, 50.0, -5.0, 0.0)).is_ok());

        let disabled = board_at_origin()
            .tweak(|m| m.boards.iter_mut().for_each(|b| b.enabled = false))
            .build_snapshot();
        assert!(validate(&disabled, "n1", &Location::mm(50.0, 50.0, -5.0, 0.0)).is_ok());
    }

    #[test]
    fn board_surface_height_is_at_risk() {
        let m = board_at_origin()
            .with_axis(Axis::linear("z").with_safe_zone(Some(Length::mm(5.0)), None))
            .build_snapshot();
        assert!(validate(&m, "n1", &Location::mm(50.0, 50.0, 0.0, 0.0)).is_err());
        assert!(validate(&m, "n1", &Location::mm(50.0, 50.0, 0.001, 0.0)).is_ok());
    }

    #[test]
    fn lowered_board_surface_shifts_the_risk_height() {
        let m = SimMachine::single_head()
            .with_board("deep", Location::mm(0.0, 0.0, -10.0, 0.0), 100.0, 100.0)
            .build_snapshot();
        assert!(validate(&m, "n1", &Location::mm(50.0, 50.0, -5.0, 0.0)).is_ok());
        assert!(validate(&m, "n1", &Location::mm(50.0, 50.0, -10.0, 0.0)).is_err());
    }

    #[test]
    fn larger_part_diameter_never_makes_a_move_safer() {
        let target = Location::mm(-3.0, 50.0, -5.0, 0.0);
        let mut previous_margin = 0.0;
        let mut became_unsafe = false;
        for max_part_diameter in [2.0, 4.0, 6.0, 8.0] {
            let m = board_at_origin()
                .tweak(with_nozzle_tooling(Some(tip(1.0, max_part_diameter)), Some(part(0.5))))
                .build_snapshot();
            let margin = safe_distance(m.tool("n1").unwrap()).to_mm();
            assert!(margin > previous_margin);
            previous_margin = margin;

            let unsafe_now = validate(&m, "n1", &target).is_err();
            assert!(!(became_unsafe && !unsafe_now), "verdict flipped back to safe");
            became_unsafe |= unsafe_now;
        }
        assert!(became_unsafe);
    }

    #[test]
    fn held_part_height_lowers_the_checked_point() {
        let target = Location::mm(50.0, 50.0, 0.5, 0.0);
        let bare = board_at_origin().build_snapshot();
        assert!(validate(&bare, "n1", &target).is_ok());

        let holding = board_at_origin()
            .tweak(with_nozzle_tooling(None, Some(part(1.0))))
            .build_snapshot();
        let err = validate(&holding, "n1", &target).unwrap_err();
        assert!(err.to_string().contains("Nozzle N1 holding R0805"));
    }

    #[test]
    fn rotated_board_gives_the_same_verdict_in_its_own_frame() {
        let straight = SimMachine::single_head()
            .with_board("b1", Location::mm(10.0, 20.0, 0.0, 0.0), 100.0, 60.0)
            .build_snapshot();
        let rotated = SimMachine::single_head()
            .with_board("b1", Location::mm(10.0, 20.0, 0.0, 90.0), 100.0, 60.0)
            .build_snapshot();
        let origin = Location::mm(10.0, 20.0, 0.0, 0.0);

        for (lx, ly) in [(50.0, 30.0), (-0.5, 30.0), (-2.0, 30.0), (99.0, 59.5), (101.5, 10.0), (50.0, 62.0)] {
            let local = Location::mm(lx, ly, -5.0, 0.0);
            let straight_target = origin + local;
            let rotated_target = origin + local.rotate_xy(90.0).derive(None, None, None, Some(0.0));
            assert_eq!(
                validate(&straight, "n1", &straight_target).is_ok(),
                validate(&rotated, "n1", &rotated_target).is_ok(),
                "verdict differs at local ({lx}, {ly})"
            );
        }
    }

    #[test]
    fn head_mate_is_checked_too() {
        // The camera sits 30 mm left of the nozzle on a virtual Z that is
        // parked below its safe zone.
        let m = board_at_origin()
            .with_axis(
                Axis::linear("zc")
                    .virtual_axis()
                    .with_safe_zone(Some(Length::zero()), None)
                    .at(-5.0),
            )
            .build_snapshot();
        let err = validate(&m, "n1", &Location::mm(80.0, 50.0, 0.0, 0.0)).unwrap_err();
        assert_eq!(
            err,
            GuardError::CollisionRisk {
                tool_description: "Camera Top".into(),
                board_id: "b1".into(),
            }
        );
        assert!(validate(&m, "n1", &Location::mm(160.0, 50.0, 0.0, 0.0)).is_ok());
    }

    #[test]
    fn safe_z_zone_is_read_through_the_z_head_offset() {
        let with_z_offset = |z: f64| {
            board_at_origin()
                .tweak(move |m| {
                    m.tools[0].transform = TransformChain::new().then(AxisTransform::HeadOffset {
                        offset: Location::mm(0.0, 0.0, z, 0.0),
                    });
                })
                .build_snapshot()
        };

        // Tool Z -5 is raw Z +5: the axis is inside its safe zone.
        let raised = with_z_offset(-10.0);
        assert!(validate(&raised, "n1", &Location::mm(50.0, 50.0, -5.0, 0.0)).is_ok());
        assert!(validate(&raised, "n1", &Location::mm(50.0, 50.0, -10.5, 0.0)).is_err());

        // Tool Z 0 is raw Z -10: below the safe zone, on the board surface.
        let lowered = with_z_offset(10.0);
        assert!(validate(&lowered, "n1", &Location::mm(50.0, 50.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn virtual_z_target_is_replaced_by_current_value() {
        // Commanding the camera far below safe Z on its virtual axis does not
        // count; only where the camera physically is.
        let m = board_at_origin()
            .with_axis(Axis::linear("zc").virtual_axis().with_safe_zone(Some(Length::zero()), None))
            .build_snapshot();
        assert!(validate(&m, "cam", &Location::mm(50.0, 50.0, -20.0, 0.0)).is_ok());
    }

    #[test]
    fn target_units_are_resolved() {
        let m = board_at_origin().build_snapshot();
        let inches = Location::new(LengthUnit::Inches, 2.0, 2.0, -0.2, 0.0);
        assert!(validate(&m, "n1", &inches).is_err());
        let far = Location::new(LengthUnit::Inches, 8.0, 8.0, -0.2, 0.0);
        assert!(validate(&m, "n1", &far).is_ok());
    }

    #[test]
    fn unmounted_or_unknown_tools_are_configuration_errors() {
        let m = board_at_origin()
            .tweak(|m| {
                let mut loose = m.tools[0].clone();
                loose.id = "loose".into();
                loose.head = None;
                m.tools.push(loose);
            })
            .build_snapshot();
        assert!(matches!(
            validate(&m, "loose", &Location::mm(50.0, 50.0, -5.0, 0.0)),
            Err(GuardError::Configuration(_))
        ));
        assert!(matches!(
            validate(&m, "ghost", &Location::default()),
            Err(GuardError::Configuration(_))
        ));
    }

    #[test]
    fn rule_adapter_delegates() {
        let m = board_at_origin().build_snapshot();
        let rule = BoardProtectionRule;
        assert_eq!(rule.name(), "board_protection");
        assert!(rule.check(&m, &MoveRequest::new("n1", Location::mm(50.0, 50.0, -5.0, 0.0))).is_err());
        assert!(rule.check(&m, &MoveRequest::new("n1", Location::mm(50.0, 50.0, 5.0, 0.0))).is_ok());
    }
}
