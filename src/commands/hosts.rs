use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use agent_rollout::hosts::{self, HostTask};

use super::{CmdResult, GlobalArgs};
use crate::output::TextOutput;

#[derive(Args)]
pub struct HostsArgs {
    /// Host list file to preview
    pub hosts_file: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostsOutput {
    pub command: String,
    pub hosts_file: String,
    pub tasks: Vec<HostTask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TextOutput for HostsOutput {
    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} host(s) in {}", self.tasks.len(), self.hosts_file);

        for (idx, task) in self.tasks.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>3}. {} (label: {}, group: {})",
                idx + 1,
                task.host,
                task.label,
                task.group
            );
        }

        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in &self.warnings {
                let _ = writeln!(out, "  - {}", warning);
            }
        }

        out
    }
}

/// Parse the host list without dispatching anything.
pub fn run(args: HostsArgs, _global: &GlobalArgs) -> CmdResult<HostsOutput> {
    let list = hosts::load(&args.hosts_file)?;

    Ok((
        HostsOutput {
            command: "hosts".to_string(),
            hosts_file: args.hosts_file.display().to_string(),
            tasks: list.tasks,
            warnings: list.warnings,
        },
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_text_lists_tasks_and_warnings() {
        let output = HostsOutput {
            command: "hosts".to_string(),
            hosts_file: "fleet.txt".to_string(),
            tasks: vec![HostTask::new("10.0.0.5", Some("web-01".into()), None)],
            warnings: vec!["line 3: empty host (',orphan')".to_string()],
        };

        assert_eq!(
            output.render_text(),
            "1 host(s) in fleet.txt\n\
             \x20   1. 10.0.0.5 (label: web-01, group: default)\n\
             \n\
             Warnings:\n\
             \x20 - line 3: empty host (',orphan')\n"
        );
    }
}
