//! rescp utility - main entrypoint
// (c) 2026 rescp developers

use std::process::ExitCode;

fn main() -> ExitCode {
    rescp::main(std::env::args_os())
}
