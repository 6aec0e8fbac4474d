// (c) 2026 rescp developers

#![allow(clippy::doc_markdown)]
//! `rescp` pushes single files to a remote host over ssh, speaking the legacy scp sink protocol,
//! and keeps trying until the file gets there (or you tell it to stop).
//!
//! ## Overview
//! - One long-lived ssh connection per remote host, dialed lazily and shared by all transfers
//! - A connection that has died underneath us is detected when the next session fails to open,
//!   and is replaced transparently, once per attempt
//! - Each file goes over its own command session running `scp -t <dir>` on the remote
//! - Failed transfers are retried under a configurable policy: single attempt, bounded, or unbounded,
//!   with a linear-then-constant backoff between attempts
//! - Everything can be cancelled, or limited by an overall deadline
//! - Optional bandwidth limiting (passed to the remote as `scp -l`) and gzip compression
//!
//! ## Using the library
//!
//! The entry point is [`Helper`], built from a [`Dialer`](transport::Dialer).
//! Use [`Helper::copy`] for a single attempt, [`Helper::try_copy`] for a bounded number of attempts,
//! or [`Helper::must_copy`] to keep going until it works.
//! Any [`Source`](transfer::Source) may be sent; it is re-opened for every attempt.
//!
//! ## Using the command-line tool
//!
//! `rescp [OPTIONS] SOURCE [user@]host:path/to/file`
//!
//! Options may also be set in a [configuration file](config) or the environment.
//! `rescp --help` lists them all.
//!
//! ## Wire protocol
//!
//! See [protocol].
//!
//! #### Feature flags
#![doc = document_features::document_features!()]

mod cli;
pub use cli::cli as main;

pub mod config;
pub use config::Configuration;

pub mod connection;
pub use connection::ConnectionManager;

pub mod error;
pub use error::{RetryError, TransferError};

mod helper;
pub use helper::Helper;

pub mod protocol;
pub mod retry;
pub mod transfer;
pub mod transport;

mod util;
pub use util::TimeFormat;

static_assertions::assert_impl_all!(Helper: Send, Sync);
static_assertions::assert_impl_all!(ConnectionManager: Send, Sync);
static_assertions::assert_obj_safe!(transfer::Source, transport::Dialer, transport::Connection, transport::Session);
