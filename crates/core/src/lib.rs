//! modshim-core
//!
//! Core library for loading third-party mod modules against the current host
//! platform: it discovers a mod's local module graph, swaps references to
//! retired platform modules, rewrites or flags incompatible instructions, and
//! hands the resulting images to the host runtime.
//!
//! All substantive logic lives here so it is testable and reusable from
//! multiple frontends; the `modshim` CLI is a thin wrapper.

pub mod codec;
pub mod db;
pub mod model;
pub mod mods;
pub mod monitor;
pub mod services;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
