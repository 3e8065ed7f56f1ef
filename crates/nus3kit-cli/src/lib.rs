//! nus3kit CLI library.
//!
//! This crate wires the bank and audio backends to a command-line surface:
//! configuration loading, tool discovery, and the command implementations
//! behind the `nus3kit` binary.

pub mod commands;
pub mod config;
