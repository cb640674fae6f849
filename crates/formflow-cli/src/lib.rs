//! Library half of the formflow CLI, so the commands can be exercised
//! from integration tests without spawning the binary.

pub mod commands;
