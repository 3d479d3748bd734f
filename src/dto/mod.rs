//! Serialized payloads crossing the engine boundary: outbound state
//! snapshots and inbound settings updates.

/// Inbound partial settings updates.
pub mod settings;
/// Outbound full-state snapshots.
pub mod snapshot;
