//! [`MotionVerifier`] – motion safety interlock / rule engine.
//!
//! Before a move is dispatched to the machine, pass it through
//! [`MotionVerifier::verify`].  Every registered [`MotionRule`] is evaluated
//! in order against the same [`MachineSnapshot`]; the first violation is
//! returned and the move is **not** executed.
//!
//! Two built-in rules are provided:
//! - [`BoardProtectionRule`] – rejects moves that would crash any tool on the
//!   moving head into an enabled board.
//! - [`SoftLimitRule`] – rejects moves that drive a physical axis outside its
//!   soft limits.

use pnpguard_machine::MachineSnapshot;
use pnpguard_types::{GuardError, Location};

use crate::board_protection::BoardProtectionRule;
use crate::soft_limits::SoftLimitRule;

// ────────────────────────────────────────────────────────────────────────────
// MoveRequest
// ────────────────────────────────────────────────────────────────────────────

/// "Put tool `tool_id` at `target`."
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRequest {
    pub tool_id: String,
    pub target: Location,
}

impl MoveRequest {
    pub fn new(tool_id: impl Into<String>, target: Location) -> Self {
        Self {
            tool_id: tool_id.into(),
            target,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MotionRule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single safety invariant that a move must satisfy.
///
/// Implement this trait to create custom rules and add them to a
/// [`MotionVerifier`] via [`MotionVerifier::add_rule`].
pub trait MotionRule: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Return `Ok(())` when the move satisfies the invariant on `machine`.
    fn check(&self, machine: &MachineSnapshot, request: &MoveRequest) -> Result<(), GuardError>;
}

// ────────────────────────────────────────────────────────────────────────────
// MotionVerifier
// ────────────────────────────────────────────────────────────────────────────

/// Rule engine that validates a [`MoveRequest`] against all registered
/// [`MotionRule`]s before it is dispatched.
///
/// # Example
///
/// ```
/// use pnpguard_kernel::verifier::{MotionVerifier, MoveRequest};
/// use pnpguard_machine::sim::SimMachine;
/// use pnpguard_types::Location;
///
/// let machine = SimMachine::single_head()
///     .with_board("b1", Location::mm(0.0, 0.0, 0.0, 0.0), 100.0, 100.0)
///     .build_snapshot();
/// let verifier = MotionVerifier::with_default_rules();
///
/// let clear = MoveRequest::new("n1", Location::mm(200.0, 200.0, -5.0, 0.0));
/// assert!(verifier.verify(&machine, &clear).is_ok());
///
/// let crash = MoveRequest::new("n1", Location::mm(50.0, 50.0, -5.0, 0.0));
/// assert!(verifier.verify(&machine, &crash).is_err());
/// ```
#[derive(Default)]
pub struct MotionVerifier {
    rules: Vec<Box<dyn MotionRule>>,
}

impl MotionVerifier {
    /// Create an empty verifier with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Board protection first, then soft limits.
    pub fn with_default_rules() -> Self {
        let mut verifier = Self::new();
        verifier.add_rule(Box::new(BoardProtectionRule));
        verifier.add_rule(Box::new(SoftLimitRule));
        verifier
    }

    /// Register a new [`MotionRule`].  Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn MotionRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate `request` against every registered rule.
    pub fn verify(&self, machine: &MachineSnapshot, request: &MoveRequest) -> Result<(), GuardError> {
        for rule in &self.rules {
            rule.check(machine, request)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnpguard_machine::Axis;
    use pnpguard_machine::sim::SimMachine;
    use pnpguard_types::Length;

    struct Forbid(&'static str);

    impl MotionRule for Forbid {
        fn name(&self) -> &str {
            self.0
        }

        fn check(&self, _: &MachineSnapshot, _: &MoveRequest) -> Result<(), GuardError> {
            Err(GuardError::Configuration(self.0.to_string()))
        }
    }

    fn limited_machine() -> MachineSnapshot {
        SimMachine::single_head()
            .with_axis(Axis::linear("x").with_soft_limits(Some(Length::zero()), Some(Length::mm(300.0))))
            .with_board("b1", Location::mm(0.0, 0.0, 0.0, 0.0), 100.0, 100.0)
            .build_snapshot()
    }

    #[test]
    fn empty_verifier_always_passes() {
        let v = MotionVerifier::new();
        let m = limited_machine();
        assert!(v
            .verify(&m, &MoveRequest::new("n1", Location::mm(50.0, 50.0, -5.0, 0.0)))
            .is_ok());
    }

    #[test]
    fn default_rules_are_ordered() {
        let v = MotionVerifier::with_default_rules();
        assert_eq!(v.rule_names(), vec!["board_protection", "soft_limits"]);
    }

    #[test]
    fn board_protection_fires_before_soft_limits() {
        let v = MotionVerifier::with_default_rules();
        let m = limited_machine();
        let result = v.verify(&m, &MoveRequest::new("n1", Location::mm(50.0, 50.0, -5.0, 0.0)));
        assert!(matches!(result, Err(GuardError::CollisionRisk { .. })));
    }

    #[test]
    fn soft_limit_fires_when_clear_of_boards() {
        let v = MotionVerifier::with_default_rules();
        let m = limited_machine();
        let result = v.verify(&m, &MoveRequest::new("n1", Location::mm(350.0, 50.0, 0.0, 0.0)));
        assert!(matches!(result, Err(GuardError::SoftLimit { ref axis, .. }) if axis == "x"));
    }

    #[test]
    fn first_failing_rule_short_circuits() {
        let mut v = MotionVerifier::new();
        v.add_rule(Box::new(Forbid("first")));
        v.add_rule(Box::new(Forbid("second")));
        let m = limited_machine();
        let result = v.verify(&m, &MoveRequest::new("n1", Location::default()));
        assert!(matches!(result, Err(GuardError::Configuration(ref s)) if s == "first"));
    }
}
