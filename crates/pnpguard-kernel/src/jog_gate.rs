//! [`JogGate`] – single interception point between operator commands and the
//! machine.
//!
//! Every jog, "move to" or camera ↔ tool targeting command must go through
//! [`JogGate::jog`], [`JogGate::move_to`], [`JogGate::target_tool`] or
//! [`JogGate::target_camera`].  The gate holds the live [`MachineRegistry`]
//! behind one lock and, while holding it:
//!
//! 1. takes a [`MachineSnapshot`],
//! 2. runs the [`MotionVerifier`] against it,
//! 3. dispatches the move only when every rule passed,
//! 4. lets the [`RoamingGuard`] decide whether the tool must go to safe Z.
//!
//! No other command can interleave between check and dispatch.  Every verdict
//! is recorded as a [`SafetyEvent`] in a bounded history.
//!
//! # Example
//!
//! ```
//! use pnpguard_kernel::{JogGate, MotionVerifier};
//! use pnpguard_machine::sim::SimMachine;
//! use pnpguard_types::Location;
//!
//! let registry = SimMachine::single_head()
//!     .with_board("b1", Location::mm(0.0, 0.0, 0.0, 0.0), 100.0, 100.0)
//!     .build()
//!     .unwrap();
//! let gate = JogGate::new(registry, MotionVerifier::with_default_rules());
//!
//! assert!(gate.jog("n1", Location::mm(200.0, 200.0, -5.0, 0.0)).is_ok());
//! assert!(gate.jog("n1", Location::mm(50.0, 50.0, -5.0, 0.0)).is_err());
//! assert_eq!(gate.events().unwrap().len(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use pnpguard_machine::{MachineRegistry, MachineSnapshot, NozzleTip, Part, ToolKind};
use pnpguard_types::{GuardError, Location, SafetyEvent, SafetyPayload};
use tracing::{info, warn};

use crate::roaming::{RoamingAdvice, RoamingGuard};
use crate::verifier::{MotionVerifier, MoveRequest};

const EVENT_SOURCE: &str = "pnpguard-kernel::jog_gate";

/// Number of [`SafetyEvent`]s kept unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Result of a dispatched move.
#[derive(Debug, Clone, PartialEq)]
pub struct JogOutcome {
    pub tool_id: String,
    pub target: Location,
    /// The tool roamed too far at unsafe Z and was sent to safe Z afterwards.
    pub safe_z_requested: bool,
    /// Set when the follow-up move to safe Z failed.  The move to `target`
    /// was dispatched regardless.
    pub safe_z_error: Option<GuardError>,
}

/// How a verified move reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Travel {
    Direct,
    AtSafeZ,
}

struct GateState {
    registry: MachineRegistry,
    roaming: RoamingGuard,
    selected_tool: Option<String>,
    last_non_camera: Option<String>,
    events: VecDeque<SafetyEvent>,
}

impl GateState {
    fn record(&mut self, payload: SafetyPayload, limit: usize) {
        self.events.push_back(SafetyEvent::new(EVENT_SOURCE, payload));
        while self.events.len() > limit {
            self.events.pop_front();
        }
    }

    /// Make `tool_id` the selected tool and return the previous selection.
    fn select(&mut self, tool_id: &str) -> Option<String> {
        let is_camera = self
            .registry
            .machine()
            .tool(tool_id)
            .is_ok_and(|t| t.kind == ToolKind::Camera);
        if !is_camera {
            self.last_non_camera = Some(tool_id.to_string());
        }
        self.selected_tool.replace(tool_id.to_string())
    }

    /// `(tool, camera)` for camera ↔ tool targeting.  The tool is the
    /// selected one; when the camera itself is selected it is the last
    /// selected non-camera tool, or else the head's default nozzle.  The
    /// camera is the default camera of the tool's head.
    fn targeting_pair(&self) -> Result<(String, String), GuardError> {
        let machine = self.registry.machine();
        let selected = self
            .selected_tool
            .as_deref()
            .ok_or_else(|| GuardError::Configuration("no tool selected".to_string()))?;
        let head = machine.owning_head(machine.tool(selected)?)?;
        let camera = machine.default_camera(&head.id).ok_or_else(|| {
            GuardError::Configuration(format!("head '{}' has no camera", head.id))
        })?;
        if selected != camera.id {
            return Ok((selected.to_string(), camera.id.clone()));
        }
        let tool_id = match &self.last_non_camera {
            Some(id) => id.clone(),
            None => machine
                .default_nozzle(&head.id)
                .map(|t| t.id.clone())
                .ok_or_else(|| {
                    GuardError::Configuration(format!("head '{}' has no nozzle", head.id))
                })?,
        };
        Ok((tool_id, camera.id.clone()))
    }
}

/// Serialises verification and dispatch of motion commands.
pub struct JogGate {
    state: Mutex<GateState>,
    verifier: MotionVerifier,
    history_limit: usize,
}

impl JogGate {
    pub fn new(registry: MachineRegistry, verifier: MotionVerifier) -> Self {
        Self {
            state: Mutex::new(GateState {
                registry,
                roaming: RoamingGuard::new(),
                selected_tool: None,
                last_non_camera: None,
                events: VecDeque::new(),
            }),
            verifier,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` events (at least one).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Jog `tool_id` to `target`.
    ///
    /// A failed follow-up move to safe Z does not fail the jog; it is
    /// reported in [`JogOutcome::safe_z_error`] and as a
    /// [`SafetyPayload::SafeZFailed`] event.
    ///
    /// # Errors
    ///
    /// The first rule violation, [`GuardError::Dispatch`] when the driver
    /// refuses, or [`GuardError::Configuration`] for unknown tools and a
    /// poisoned gate.
    pub fn jog(&self, tool_id: &str, target: Location) -> Result<JogOutcome, GuardError> {
        let mut state = self.lock()?;
        self.dispatch(&mut state, tool_id, target, Travel::Direct, true)
    }

    /// Move `tool_id` to `target` as a targeted user action that is not a jog.
    pub fn move_to(&self, tool_id: &str, target: Location) -> Result<JogOutcome, GuardError> {
        let mut state = self.lock()?;
        self.dispatch(&mut state, tool_id, target, Travel::Direct, false)
    }

    /// Bring the tool to where the head's default camera is looking, by way
    /// of safe Z.  The tool keeps its rotation.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] when no tool is selected or the head has
    /// no camera, plus everything [`JogGate::jog`] returns.
    pub fn target_tool(&self) -> Result<JogOutcome, GuardError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let (tool_id, camera_id) = state.targeting_pair()?;
        let machine = state.registry.machine();
        let camera_at = machine.current_location(machine.tool(&camera_id)?);
        let tool_at = machine.current_location(machine.tool(&tool_id)?);
        let target = camera_at.derive(None, None, None, Some(tool_at.rotation));
        self.dispatch(state, &tool_id, target, Travel::AtSafeZ, false)
    }

    /// Bring the head's default camera over the tool, by way of safe Z.
    ///
    /// # Errors
    ///
    /// As [`JogGate::target_tool`].
    pub fn target_camera(&self) -> Result<JogOutcome, GuardError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let (tool_id, camera_id) = state.targeting_pair()?;
        let machine = state.registry.machine();
        let camera_at = machine.current_location(machine.tool(&camera_id)?);
        let tool_at = machine.current_location(machine.tool(&tool_id)?);
        let target = tool_at.derive(None, None, None, Some(camera_at.rotation));
        self.dispatch(state, &camera_id, target, Travel::AtSafeZ, false)
    }

    /// Select `tool_id` without moving it.
    ///
    /// # Errors
    ///
    /// [`GuardError::Configuration`] for unknown or unmounted tools.
    pub fn select_tool(&self, tool_id: &str) -> Result<(), GuardError> {
        let mut state = self.lock()?;
        let machine = state.registry.machine();
        machine.owning_head(machine.tool(tool_id)?)?;
        state.select(tool_id);
        Ok(())
    }

    /// Run the verifier without dispatching anything.
    pub fn check(&self, tool_id: &str, target: Location) -> Result<(), GuardError> {
        let state = self.lock()?;
        self.verifier
            .verify(state.registry.machine(), &MoveRequest::new(tool_id, target))
    }

    fn dispatch(
        &self,
        state: &mut GateState,
        tool_id: &str,
        target: Location,
        travel: Travel,
        jogging: bool,
    ) -> Result<JogOutcome, GuardError> {
        let request = MoveRequest::new(tool_id, target);
        let verdict = self
            .verifier
            .verify(state.registry.machine(), &request)
            .and_then(|()| match travel {
                Travel::Direct => state.registry.move_tool(tool_id, target),
                Travel::AtSafeZ => state.registry.move_tool_at_safe_z(tool_id, target),
            });
        if let Err(err) = verdict {
            warn!(tool = tool_id, target = %target, error = %err, "move rejected");
            state.record(
                SafetyPayload::MoveRejected {
                    tool: tool_id.to_string(),
                    reason: err.to_string(),
                },
                self.history_limit,
            );
            return Err(err);
        }
        state.record(
            SafetyPayload::MoveDispatched {
                tool: tool_id.to_string(),
                target,
            },
            self.history_limit,
        );

        let previously_selected = state.select(tool_id);
        let advice = state.roaming.observe(
            state.registry.machine(),
            tool_id,
            previously_selected.as_deref(),
            jogging,
        );

        let mut outcome = JogOutcome {
            tool_id: tool_id.to_string(),
            target,
            safe_z_requested: advice == RoamingAdvice::MoveToSafeZ,
            safe_z_error: None,
        };
        if outcome.safe_z_requested {
            match state.registry.move_tool_to_safe_z(tool_id) {
                Ok(_) => {
                    info!(tool = tool_id, "sent to safe Z after roaming");
                    state.record(
                        SafetyPayload::SafeZRequested {
                            tool: tool_id.to_string(),
                        },
                        self.history_limit,
                    );
                }
                Err(err) => {
                    warn!(tool = tool_id, error = %err, "safe Z move after roaming failed");
                    state.record(
                        SafetyPayload::SafeZFailed {
                            tool: tool_id.to_string(),
                            reason: err.to_string(),
                        },
                        self.history_limit,
                    );
                    outcome.safe_z_error = Some(err);
                }
            }
        }
        Ok(outcome)
    }

    /// Switch board protection on or off for the whole machine.
    pub fn set_board_protection(&self, enabled: bool) -> Result<(), GuardError> {
        let mut state = self.lock()?;
        state.registry.set_board_protection(enabled);
        info!(enabled, "board protection changed");
        state.record(SafetyPayload::BoardProtectionChanged { enabled }, self.history_limit);
        Ok(())
    }

    /// Include or exclude one board from board protection.
    pub fn set_board_enabled(&self, board_id: &str, enabled: bool) -> Result<(), GuardError> {
        self.lock()?.registry.set_board_enabled(board_id, enabled)
    }

    /// Record a pick: `nozzle_id` now holds `part`.
    pub fn load_part(&self, nozzle_id: &str, part: Part) -> Result<(), GuardError> {
        self.lock()?.registry.set_part(nozzle_id, Some(part))
    }

    /// Record a place: `nozzle_id` holds nothing.
    pub fn unload_part(&self, nozzle_id: &str) -> Result<(), GuardError> {
        self.lock()?.registry.set_part(nozzle_id, None)
    }

    pub fn load_nozzle_tip(&self, nozzle_id: &str, tip: Option<NozzleTip>) -> Result<(), GuardError> {
        self.lock()?.registry.load_nozzle_tip(nozzle_id, tip)
    }

    pub fn snapshot(&self) -> Result<MachineSnapshot, GuardError> {
        Ok(self.lock()?.registry.snapshot())
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> Result<Vec<SafetyEvent>, GuardError> {
        Ok(self.lock()?.events.iter().cloned().collect())
    }

    /// The tool targeted by the last dispatched move or selection.
    pub fn selected_tool(&self) -> Result<Option<String>, GuardError> {
        Ok(self.lock()?.selected_tool.clone())
    }

    pub fn driver_id(&self) -> Result<String, GuardError> {
        Ok(self.lock()?.registry.driver_id().to_string())
    }

    fn lock(&self) -> Result<MutexGuard<'_, GateState>, GuardError> {
        self.state
            .lock()
            .map_err(|_| GuardError::Configuration("jog gate lock poisoned".to_string()))
    }
}
