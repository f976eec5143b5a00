//! Building blocks shared by all agents.

pub mod prompt;
