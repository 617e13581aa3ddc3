//! Command-line runtime for issuing a single dRPC call.
//!
//! The runtime splits configuration flags from the call arguments, loads the
//! layered configuration, connects to the configured socket, sends one call
//! while holding the connection's exclusive lock, and prints the response as
//! a JSON line. Configuration loading and the output streams can be
//! substituted so tests drive the same path as the binary.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use drpc_client::{Call, CallContext, ClientConnection, Response};
use drpc_config::Config;
use tracing::{debug, warn};

mod cli;
mod config;
mod errors;
mod output;
mod telemetry;

use cli::Cli;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::split_config_arguments;
pub(crate) use errors::AppError;

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    match execute(args, stdout, loader) {
        Ok(exit_code) => exit_code,
        // `--help` and `--version` surface as clap errors but belong on stdout.
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W, L>(args: I, stdout: &mut W, loader: &L) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(split.call_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    config.validate()?;
    telemetry::initialise(&config)?;

    let call = cli.call()?;
    let response = exchange(&config, &cli.context(), call)?;
    output::write_response(stdout, &response)?;

    Ok(if response.status().is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Connects, sends `call` under the exclusive lock, and closes again.
fn exchange(config: &Config, context: &CallContext, call: Call) -> Result<Response, AppError> {
    let connection = ClientConnection::from_config(config);
    connection.connect()?;
    debug!(target: CLI_TARGET, path = %connection.socket_path(), "sending call");

    let guard = connection.lock();
    let outcome = connection.send_msg(context, call);
    guard.unlock();

    if let Err(error) = connection.close() {
        warn!(target: CLI_TARGET, error = %error, "failed to close dRPC connection");
    }
    Ok(outcome?)
}
