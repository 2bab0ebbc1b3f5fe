//! The single-host deploy operation.
//!
//! The orchestrator treats this as opaque: it hands over one task and the
//! task's log file and gets back success or failure. [`ScriptDeployer`] is
//! the production implementation; any `Fn(&HostTask, &File)` closure works
//! too.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::RolloutConfig;
use crate::error::{Error, Result};
use crate::hosts::HostTask;
use crate::utils::{command, io};

/// How a single host deployment ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeployOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: None,
            error: Some(error.into()),
        }
    }

    pub fn from_exit_code(code: i32) -> Self {
        Self {
            success: code == 0,
            exit_code: Some(code),
            error: None,
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::from_exit_code(code),
            None => Self::failed(format!("terminated by signal ({})", status)),
        }
    }
}

/// Deploys the agent to one host, writing everything it prints to `log`.
///
/// An `Err` is treated the same as a failed outcome by the dispatcher.
pub trait HostDeployer: Send + Sync {
    /// Checked once before any host is dispatched.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    fn deploy(&self, task: &HostTask, log: &File) -> Result<DeployOutcome>;
}

impl<F> HostDeployer for F
where
    F: Fn(&HostTask, &File) -> Result<DeployOutcome> + Send + Sync,
{
    fn deploy(&self, task: &HostTask, log: &File) -> Result<DeployOutcome> {
        self(task, log)
    }
}

/// Runs `<script> <host> <label> <group>` with output redirected to the log.
#[derive(Debug, Clone)]
pub struct ScriptDeployer {
    script: PathBuf,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl ScriptDeployer {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &RolloutConfig) -> Self {
        Self::new(config.deploy_script_path())
            .with_env(config.script_env())
            .with_timeout(config.task_timeout())
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(task: &HostTask) -> Vec<String> {
        vec![task.host.clone(), task.label.clone(), task.group.clone()]
    }

    fn write_header(&self, task: &HostTask, log: &File) -> Result<()> {
        let program = self.script.display().to_string();
        let mut header = format!(
            "# host: {}\n# label: {}\n# group: {}\n# command: {}\n",
            task.host,
            task.label,
            task.group,
            command::command_line(&program, &Self::args(task))
        );
        if !self.env.is_empty() {
            let keys: Vec<&str> = self.env.keys().map(String::as_str).collect();
            header.push_str(&format!("# env: {}\n", keys.join(", ")));
        }
        header.push_str(&format!(
            "# timeout: {}\n\n",
            self.timeout
                .map(|t| format!("{}s", t.as_secs()))
                .unwrap_or_else(|| "none".to_string())
        ));
        io::append(log, &header, "write host log header")
    }

    fn wait(&self, child: &mut Child, log: &File) -> Result<DeployOutcome> {
        let Some(timeout) = self.timeout else {
            let status = child
                .wait()
                .map_err(|e| Error::internal_io(e.to_string(), Some("wait for deploy script".into())))?;
            return Ok(DeployOutcome::from_status(status));
        };

        let status = match command::wait_until(child, Instant::now() + timeout) {
            Ok(status) => status,
            Err(err) => {
                command::kill_process_group(child);
                return Err(err);
            }
        };
        if let Some(status) = status {
            return Ok(DeployOutcome::from_status(status));
        }

        // Descendants go too; none may write to the log after this note.
        command::kill_process_group(child);
        let reason = format!("timed out after {}s", timeout.as_secs());
        io::append(log, &format!("\n# {}, process killed\n", reason), "write host log")?;
        Ok(DeployOutcome::failed(reason))
    }
}

impl HostDeployer for ScriptDeployer {
    fn preflight(&self) -> Result<()> {
        let program = self.script.display().to_string();

        let resolved = command::resolve_program(&program)
            .ok_or_else(|| Error::tool_missing(&program, "deploy script not found"))?;

        if !command::is_executable(&resolved) {
            return Err(Error::tool_missing(&program, "deploy script is not executable")
                .with_hint(format!("Run 'chmod +x {}'", resolved.display())));
        }

        Ok(())
    }

    fn deploy(&self, task: &HostTask, log: &File) -> Result<DeployOutcome> {
        self.write_header(task, log)?;

        let stdout = log
            .try_clone()
            .map_err(|e| Error::internal_io(e.to_string(), Some("clone host log".into())))?;
        let stderr = log
            .try_clone()
            .map_err(|e| Error::internal_io(e.to_string(), Some("clone host log".into())))?;

        let mut cmd = Command::new(&self.script);
        cmd
            .args(Self::args(task))
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        command::isolate_process_group(&mut cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| {
                Error::command_failed(self.script.display().to_string(), None, e.to_string())
            })?;

        tracing::debug!(host = %task.host, pid = child.id(), "deploy script started");

        self.wait(&mut child, log)
    }
}
