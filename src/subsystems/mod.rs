//! Subsystem modules for the career simulator.

pub mod agents;
pub mod comms;
pub mod runtime;
pub mod simulation;
