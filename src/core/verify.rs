//! Post-run agent listing.
//!
//! Purely informational: the listing is shown to the operator and never
//! changes a host's status or the exit code.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::config::VerifyConfig;
use crate::error::Result;
use crate::utils::command;

/// Read-only query against the manager's control plane.
pub trait AgentQuery: Send + Sync {
    /// Command line shown next to the results.
    fn describe(&self) -> String;

    /// One entry per non-empty output line.
    fn list_agents(&self) -> Result<Vec<String>>;
}

/// `kubectl exec -n <namespace> <pod> -- <command...>`
#[derive(Debug, Clone)]
pub struct KubectlAgentQuery {
    kubectl: String,
    namespace: String,
    pod: String,
    command: Vec<String>,
    timeout: Duration,
}

impl KubectlAgentQuery {
    pub fn from_config(config: &VerifyConfig) -> Self {
        Self {
            kubectl: config.kubectl.clone(),
            namespace: config.namespace.clone(),
            pod: config.manager_pod.clone(),
            command: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "exec".to_string(),
            "-n".to_string(),
            self.namespace.clone(),
            self.pod.clone(),
            "--".to_string(),
        ];
        args.extend(self.command.iter().cloned());
        args
    }
}

impl AgentQuery for KubectlAgentQuery {
    fn describe(&self) -> String {
        command::command_line(&self.kubectl, &self.args())
    }

    fn list_agents(&self) -> Result<Vec<String>> {
        let stdout = command::run_with_timeout(&self.kubectl, &self.args(), self.timeout)?;
        Ok(stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect())
    }
}

/// What the agent query returned, or why it could not run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub command: String,
    pub agents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Verification {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Registered agents ({}):", self.command);

        if let Some(warning) = &self.warning {
            let _ = writeln!(out, "  unavailable: {}", warning);
        } else if self.agents.is_empty() {
            out.push_str("  (no output)\n");
        } else {
            for agent in &self.agents {
                let _ = writeln!(out, "  {}", agent);
            }
        }

        out
    }
}

/// Run the query. Failures become a warning on the returned value.
pub fn verify(query: &dyn AgentQuery) -> Verification {
    let command = query.describe();

    match query.list_agents() {
        Ok(agents) => {
            tracing::info!(count = agents.len(), "agent listing retrieved");
            Verification {
                command,
                agents,
                warning: None,
            }
        }
        Err(err) => {
            let warning = err.describe();
            tracing::warn!(code = err.code.as_str(), "agent listing failed: {}", warning);
            Verification {
                command,
                agents: Vec::new(),
                warning: Some(warning),
            }
        }
    }
}
