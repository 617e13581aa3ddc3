//! JSON rendering of a call's response.

use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use drpc_client::Response;
use serde::Serialize;

use crate::AppError;

/// One line of `drpc` output.
#[derive(Debug, Serialize)]
pub(crate) struct ResponseLine {
    sequence: i64,
    status: &'static str,
    body: String,
}

impl From<&Response> for ResponseLine {
    fn from(response: &Response) -> Self {
        Self {
            sequence: response.sequence,
            status: response.status().as_str(),
            body: STANDARD.encode(&response.body),
        }
    }
}

/// Writes `response` to `stdout` as a single JSON line.
pub(crate) fn write_response<W: Write>(stdout: &mut W, response: &Response) -> Result<(), AppError> {
    serde_json::to_writer(&mut *stdout, &ResponseLine::from(response))
        .map_err(AppError::SerialiseResponse)?;
    stdout.write_all(b"\n").map_err(AppError::WriteResponse)?;
    stdout.flush().map_err(AppError::WriteResponse)
}
