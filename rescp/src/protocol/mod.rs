//! The legacy scp sink protocol, as spoken by `scp -t`
// (c) 2026 rescp developers
//!
//! Pushing one file looks like this on the wire:
//!
//! ```text
//! initiator                                 sink (scp -t DIR)
//!    |                                          |
//!    |  <----------------------------------  0   |  ready
//!    |  C0644 <size> <name>\n  ---------->       |
//!    |  <----------------------------------  0   |  header accepted
//!    |  <size> bytes of payload  -------->       |
//!    |  0x00  ---------------------------->      |  end of file
//!    |  <----------------------------------  0   |  file written
//! ```
//!
//! The sink reports trouble with a status byte of 1 (warning) or 2 (fatal) followed by a
//! line of text; see [`ack`].
//!
//! We never wait for the sink between steps. The whole envelope is streamed as soon as the
//! command starts, and the acknowledgements are examined after the remote has exited.

pub mod ack;
pub mod command;
pub mod envelope;

pub use command::{Flags, remote_command, split_destination};
pub use envelope::{control_line, encode};
