//! CLI entrypoint for the dRPC client.
//!
//! The binary delegates to [`drpc_cli::run`], which loads configuration,
//! parses the call arguments, and prints the server's response.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    drpc_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
