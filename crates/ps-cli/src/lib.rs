//! Support library for the `ps-shape` binary.
//!
//! Holds the pieces with a stable contract (exit codes) and the logging setup,
//! so both can be tested without spawning the binary.

pub mod exit_codes;
pub mod logging;
