//! [`SoftLimitRule`] – keeps physical axes inside their configured travel.

use pnpguard_machine::MachineSnapshot;
use pnpguard_types::GuardError;
use tracing::warn;

use crate::verifier::{MotionRule, MoveRequest};

/// Rejects a move when any physical linear axis it drives would end up
/// outside `[soft_limit_low, soft_limit_high]`.
///
/// Axes the move does not drive are not re-checked; virtual and rotation axes
/// are never limited.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftLimitRule;

impl MotionRule for SoftLimitRule {
    fn name(&self) -> &str {
        "soft_limits"
    }

    fn check(&self, machine: &MachineSnapshot, request: &MoveRequest) -> Result<(), GuardError> {
        let tool = machine.tool(&request.tool_id)?;
        for (name, coordinate) in tool.to_raw(request.target).iter() {
            let Some(axis) = machine.axis(name) else {
                continue;
            };
            if let Some(details) = axis.soft_limit_violation(coordinate) {
                warn!(tool = %tool, axis = name, %details, "move rejected by soft limit");
                return Err(GuardError::SoftLimit {
                    axis: name.to_string(),
                    details,
                });
            }
        }
        Ok(())
    }
}
