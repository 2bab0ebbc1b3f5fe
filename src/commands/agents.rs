use clap::Args;
use serde::Serialize;

use agent_rollout::config::ConfigOverrides;
use agent_rollout::verify::{AgentQuery, KubectlAgentQuery, Verification};

use super::{CmdResult, GlobalArgs};
use crate::output::TextOutput;

#[derive(Args)]
pub struct AgentsArgs {}

#[derive(Debug, Serialize)]
pub struct AgentsOutput {
    pub command: String,
    pub verification: Verification,
}

impl TextOutput for AgentsOutput {
    fn render_text(&self) -> String {
        self.verification.render_text()
    }
}

/// List registered agents without deploying. Unlike the post-run check, a
/// failing query is an error here.
pub fn run(_args: AgentsArgs, global: &GlobalArgs) -> CmdResult<AgentsOutput> {
    let config = global.resolve_config(ConfigOverrides::default())?;
    let query = KubectlAgentQuery::from_config(&config.verify);

    let agents = query.list_agents().map_err(|e| {
        e.with_hint(format!(
            "Check that '{}' can reach pod '{}' in namespace '{}'",
            config.verify.kubectl, config.verify.manager_pod, config.verify.namespace
        ))
    })?;

    Ok((
        AgentsOutput {
            command: "agents".to_string(),
            verification: Verification {
                command: query.describe(),
                agents,
                warning: None,
            },
        },
        0,
    ))
}
