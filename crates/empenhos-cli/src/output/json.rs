use std::io;

use empenhos_client::contracts::envelope::failure_from_error;
use empenhos_client::{ClientError, SuccessEnvelope};
use serde::Serialize;

/// The envelope as the client built it: `ok`, `command`, `version`, `data`
/// and any `warnings`.
pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    serialize_json_pretty(success)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&failure_from_error(error))
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}
