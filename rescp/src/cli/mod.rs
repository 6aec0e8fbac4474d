//! Command Line Interface for rescp
// (c) 2026 rescp developers
mod args;
mod cli_main;
pub use cli_main::cli;
