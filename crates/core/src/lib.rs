//! Domain types and pure rules for the Veil generation client.
//!
//! Nothing in this crate performs I/O. The async client that talks to
//! the remote generation service lives in `veil-genai`.

pub mod data_url;
pub mod error;
pub mod generation;
pub mod polling;
pub mod types;
