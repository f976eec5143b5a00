//! career-sim — multi-agent career day simulator.
//!
//! Library root; the binary entry point is `src/main.rs`. Integration tests
//! drive the simulation and channels through these modules.

pub mod bootstrap;
pub mod core;
pub mod llm;
pub mod subsystems;
