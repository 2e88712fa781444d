//! `veil` command-line client library.
//!
//! Argument parsing and command runners live here so they can be
//! tested; the binary entrypoint is `main.rs`.

pub mod args;
pub mod commands;
pub mod output;
