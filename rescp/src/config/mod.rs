// (c) 2026 rescp developers
//! # Configuration management
//!
//! rescp obtains run-time configuration from the following sources, in order:
//! 1. Command-line options
//! 2. Environment variables, named after the option in upper case with a `RESCP_` prefix
//!    (for example `RESCP_LIMIT_KB=100`)
//! 3. The user's configuration file
//!    * On Linux, this is `~/.config/rescp/rescp.toml`
//!    * On other platforms it is `rescp/rescp.toml` within the platform's user configuration directory
//! 4. The system-wide configuration file
//!    * On Unix, this is `/etc/rescp.toml`
//! 5. Hard-wired defaults
//!
//! Each option may appear in multiple places; the highest priority source wins.
//! Run `rescp --show-config` to see the result, and where each value came from.
//!
//! ## File format
//!
//! Configuration files are TOML, with options given in snake case:
//!
//! ```toml
//! address = "backup.example.com:2222"
//! remote_user = "archive"
//! identity_file = "~/.ssh/id_backup"
//! limit_kb = 500
//! retry = "unbounded"
//! deadline = 3600
//! ```
//!
//! The set of supported fields is the [`Configuration`] structure.

mod manager;
mod structure;

pub use manager::{DisplayAdapter, Manager};
pub use structure::{Configuration, ConfigurationArgs, RetryKind, TransportKind};

pub(crate) const BASE_CONFIG_FILENAME: &str = "rescp.toml";
pub(crate) const ENV_PREFIX: &str = "RESCP_";
