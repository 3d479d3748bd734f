//! Engine services: the orchestrator, the snapshot hub, content generation
//! and the timer-driven flow machinery.

/// Best-effort content generation seam.
pub mod generator;
/// Snapshot broadcasting.
pub mod hub;
/// Room table and command surface.
pub mod orchestrator;

pub(crate) mod flow;
pub(crate) mod monitor;
