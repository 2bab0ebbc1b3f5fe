//! CLI response formatting and output.
//!
//! Provides the JSON envelope, text rendering, and exit code mapping.

use std::io::{self, Write};

use agent_rollout::error::Hint;
use agent_rollout::{Error, Result};
use serde::Serialize;

/// Human-readable form of a command's output, printed when `--json` is off.
pub trait TextOutput {
    fn render_text(&self) -> String;
}

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
                retryable: err.retryable,
            }),
        }
    }
}

fn write_stdout(payload: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = write!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    let payload = response.to_json()?;
    write_stdout(&format!("{}\n", payload))
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

/// Any error ends the process with 1, same as a failed host.
pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => (Err(err), 1),
    }
}

/// `error: ...` plus one `hint: ...` line per hint, for stderr.
pub fn render_error_text(err: &Error) -> String {
    let mut out = format!("error: {}\n", err.describe());
    for hint in &err.hints {
        out.push_str(&format!("hint: {}\n", hint.message));
    }
    out
}

pub fn print_text_result<T: TextOutput>(result: Result<(T, i32)>) -> i32 {
    match result {
        Ok((data, exit_code)) => {
            if let Err(err) = write_stdout(&data.render_text()) {
                eprint!("{}", render_error_text(&err));
                return 1;
            }
            exit_code
        }
        Err(err) => {
            tracing::debug!(code = err.code.as_str(), details = %err.details, "command failed");
            eprint!("{}", render_error_text(&err));
            1
        }
    }
}

/// Print a command result in the selected mode and return its exit code.
pub fn emit<T: Serialize + TextOutput>(result: Result<(T, i32)>, json: bool) -> i32 {
    if !json {
        return print_text_result(result);
    }

    let (json_result, exit_code) = map_cmd_result_to_json(result);
    if let Err(err) = print_json_result(json_result) {
        eprint!("{}", render_error_text(&err));
        return 1;
    }
    exit_code
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_rollout::ErrorCode;

    struct Greeting(&'static str);

    impl Serialize for Greeting {
        fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
            s.serialize_str(self.0)
        }
    }

    #[test]
    fn errors_map_to_exit_one() {
        let result: Result<(Greeting, i32)> =
            Err(Error::host_list_empty("hosts.txt", Vec::new()));
        let (json, code) = map_cmd_result_to_json(result);
        assert_eq!(code, 1);
        assert_eq!(json.unwrap_err().code, ErrorCode::ConfigHostListEmpty);
    }

    #[test]
    fn success_keeps_command_exit_code() {
        let (json, code) = map_cmd_result_to_json(Ok((Greeting("done"), 1)));
        assert_eq!(code, 1);
        assert_eq!(json.unwrap(), serde_json::json!("done"));
    }

    #[test]
    fn error_envelope_omits_empty_hints() {
        let err = Error::tool_missing("kubectl", "not found on PATH");
        let value = serde_json::to_value(CliResponse::<()>::from_error(&err)).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "infra.tool_missing");
        assert!(value["error"].get("hints").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn error_text_lists_hints() {
        let err = Error::tool_missing("./deploy-agent.sh", "deploy script is not executable")
            .with_hint("Run 'chmod +x ./deploy-agent.sh'");

        assert_eq!(
            render_error_text(&err),
            "error: Required tool './deploy-agent.sh' is not available: deploy script is not executable\n\
             hint: Run 'chmod +x ./deploy-agent.sh'\n"
        );
    }
}
