//! Zapkit CLI
//!
//! Command implementations behind the `zapkit` binary. Exposed as a library
//! so the commands can be exercised without spawning the binary.

pub mod commands;
pub mod ui;
