//! `pnpguard-kernel` – Motion Safety
//!
//! Decides whether a requested tool move may be sent to the machine.  It
//! does not plan motion; it enforces rules and serialises dispatch.
//!
//! # Modules
//!
//! - [`verifier`] – [`MotionVerifier`][verifier::MotionVerifier]: a rule
//!   engine that validates every [`MoveRequest`][verifier::MoveRequest]
//!   against registered [`MotionRule`][verifier::MotionRule]s and returns the
//!   first violation.
//! - [`board_protection`] – [`BoardProtectionRule`][board_protection::BoardProtectionRule]
//!   and [`validate`][board_protection::validate]: rejects moves that would
//!   bring any tool on the moving head down onto an enabled board.
//! - [`soft_limits`] – [`SoftLimitRule`][soft_limits::SoftLimitRule]: rejects
//!   moves that drive a physical axis past its soft limits.
//! - [`jog_gate`] – [`JogGate`][jog_gate::JogGate]: the single interception
//!   point between operator commands and the machine.  Verification and
//!   dispatch happen under one lock.
//! - [`roaming`] – [`RoamingGuard`][roaming::RoamingGuard]: sends a tool with
//!   a virtual Z to safe Z once it has roamed too far at unsafe Z.

pub mod board_protection;
pub mod jog_gate;
pub mod roaming;
pub mod soft_limits;
pub mod verifier;

pub use board_protection::{BoardProtectionRule, safe_distance, validate};
pub use jog_gate::{JogGate, JogOutcome};
pub use roaming::{RoamingAdvice, RoamingGuard};
pub use soft_limits::SoftLimitRule;
pub use verifier::{MotionRule, MotionVerifier, MoveRequest};
