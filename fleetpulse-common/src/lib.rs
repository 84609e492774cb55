//! Shared building blocks for the FleetPulse backend and node agent.
//!
//! Everything that crosses the MQTT bus lives here: wire payloads, the
//! topic layout, the domain log system, and the `MessageBus` abstraction
//! (with a recording mock for tests).

pub mod bus;
pub mod clock;
pub mod log;
pub mod names;
pub mod topics;
pub mod wire;
