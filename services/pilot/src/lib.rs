//! VTube Pilot Service Library Crate
//!
//! Configuration loading and the reply pipeline that drives an avatar from
//! viewer text. The `pilot` binary is a thin wrapper around this library.

pub mod config;
pub mod pipeline;
