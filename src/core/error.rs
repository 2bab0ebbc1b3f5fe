use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigHostListEmpty,
    ConfigHostListUnreadable,
    ConfigFileUnreadable,
    ConfigInvalidJson,
    ConfigInvalidValue,

    InfraToolMissing,
    InfraCommandFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigHostListEmpty => "config.host_list_empty",
            ErrorCode::ConfigHostListUnreadable => "config.host_list_unreadable",
            ErrorCode::ConfigFileUnreadable => "config.file_unreadable",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::InfraToolMissing => "infra.tool_missing",
            ErrorCode::InfraCommandFailed => "infra.command_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// Invalid or empty input. Always raised before any host is dispatched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConfigHostListEmpty
                | ErrorCode::ConfigHostListUnreadable
                | ErrorCode::ConfigFileUnreadable
                | ErrorCode::ConfigInvalidJson
                | ErrorCode::ConfigInvalidValue
        )
    }

    /// The orchestrator could not reach tooling it depends on.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ErrorCode::InfraToolMissing | ErrorCode::InfraCommandFailed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostListDetails {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMissingDetails {
    pub tool: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn host_list_empty(path: impl Into<String>, warnings: Vec<String>) -> Self {
        let details = to_details(HostListDetails {
            path: path.into(),
            error: None,
            warnings,
        });

        Self::new(
            ErrorCode::ConfigHostListEmpty,
            "Host list contains no valid entries",
            details,
        )
        .with_hint("Add one 'host[,label[,group]]' record per line")
    }

    pub fn host_list_unreadable(path: impl Into<String>, error: impl Into<String>) -> Self {
        let details = to_details(HostListDetails {
            path: path.into(),
            error: Some(error.into()),
            warnings: Vec::new(),
        });

        Self::new(
            ErrorCode::ConfigHostListUnreadable,
            "Host list file could not be read",
            details,
        )
    }

    pub fn config_file_unreadable(path: impl Into<String>, error: impl Into<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context: Some(path.into()),
        });

        Self::new(
            ErrorCode::ConfigFileUnreadable,
            "Configuration file could not be read",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn tool_missing(tool: impl Into<String>, problem: impl Into<String>) -> Self {
        let tool = tool.into();
        let details = to_details(ToolMissingDetails {
            tool: tool.clone(),
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::InfraToolMissing,
            format!("Required tool '{}' is not available", tool),
            details,
        )
    }

    pub fn command_failed(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        let details = to_details(CommandFailedDetails {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        });

        Self::new(ErrorCode::InfraCommandFailed, "Command failed", details)
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// Message plus the most specific detail available, for single-line display.
    pub fn describe(&self) -> String {
        let detail = ["problem", "error", "stderr"]
            .iter()
            .find_map(|key| self.details.get(*key).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty());

        match detail {
            Some(detail) => format!("{}: {}", self.message, detail.trim()),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_list_empty_is_configuration_error() {
        let err = Error::host_list_empty("hosts.csv", vec!["line 2: empty host".to_string()]);
        assert_eq!(err.code.as_str(), "config.host_list_empty");
        assert!(err.code.is_configuration());
        assert!(!err.code.is_infrastructure());
        assert_eq!(err.details["warnings"][0], "line 2: empty host");
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn tool_missing_is_infrastructure_error() {
        let err = Error::tool_missing("kubectl", "not found on PATH");
        assert!(err.code.is_infrastructure());
        assert_eq!(err.message, "Required tool 'kubectl' is not available");
    }

    #[test]
    fn describe_includes_problem_detail() {
        let err = Error::config_invalid_value("parallel", Some("0".to_string()), "must be >= 1");
        assert_eq!(err.describe(), "Invalid configuration value: must be >= 1");
    }

    #[test]
    fn describe_falls_back_to_message() {
        let err = Error::new(ErrorCode::InternalUnexpected, "boom", Value::Null);
        assert_eq!(err.describe(), "boom");
    }

    #[test]
    fn configuration_codes_share_the_config_namespace() {
        let codes = [
            ErrorCode::ConfigHostListEmpty,
            ErrorCode::ConfigHostListUnreadable,
            ErrorCode::ConfigFileUnreadable,
            ErrorCode::ConfigInvalidJson,
            ErrorCode::ConfigInvalidValue,
            ErrorCode::InfraToolMissing,
            ErrorCode::InfraCommandFailed,
            ErrorCode::InternalIoError,
            ErrorCode::InternalJsonError,
            ErrorCode::InternalUnexpected,
        ];

        for code in codes {
            assert_eq!(code.is_configuration(), code.as_str().starts_with("config."));
            assert_eq!(code.is_infrastructure(), code.as_str().starts_with("infra."));
        }
    }
}
