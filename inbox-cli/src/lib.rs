//! Haven inbox command-line front end
//!
//! The binary is a thin wrapper; command handling lives here so the
//! integration tests can drive it directly.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod render;

pub use cli::Cli;
pub use commands::run;
