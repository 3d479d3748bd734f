//! Library crate for dare-night-back: the real-time truth-or-dare game
//! engine, exposing modules for transports and integration tests.

/// Runtime configuration and default content lists.
pub mod config;
/// Payloads crossing the engine boundary.
pub mod dto;
/// Crate-level error type.
pub mod error;
/// Orchestrator, snapshot hub, generation and flow machinery.
pub mod services;
/// Per-room game state.
pub mod state;
