use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use serde_json::Value;

use agent_rollout::config::ConfigOverrides;
use agent_rollout::deployer::ScriptDeployer;
use agent_rollout::hosts;
use agent_rollout::rollout::Rollout;
use agent_rollout::verify::KubectlAgentQuery;
use agent_rollout::Error;

use super::{CmdResult, GlobalArgs};
use crate::output::TextOutput;

#[derive(Args)]
pub struct DeployArgs {
    /// Host list file, one `host[,label[,group]]` per line
    pub hosts_file: PathBuf,

    /// Maximum number of hosts deployed at once
    #[arg(short = 'p', long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Kill a host's deploy script after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Single-host deploy script
    #[arg(long, value_name = "PATH")]
    pub deploy_script: Option<String>,

    /// Directory for the summary and per-host logs
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<String>,

    /// Manager address exported to the deploy script as WAZUH_MANAGER
    #[arg(long, value_name = "ADDR")]
    pub manager: Option<String>,

    /// Skip listing registered agents after the run
    #[arg(long)]
    pub skip_verify: bool,
}

impl DeployArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            deploy_script: self.deploy_script.clone(),
            parallel: self.parallel,
            task_timeout_secs: self.timeout,
            log_dir: self.log_dir.clone(),
            manager_address: self.manager.clone(),
            skip_verify: self.skip_verify,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutput {
    pub command: String,
    pub hosts_file: String,
    #[serde(flatten)]
    pub report: Value,
    #[serde(skip)]
    text: String,
}

impl TextOutput for DeployOutput {
    fn render_text(&self) -> String {
        self.text.clone()
    }
}

pub fn run(args: DeployArgs, global: &GlobalArgs) -> CmdResult<DeployOutput> {
    let config = global.resolve_config(args.overrides())?;
    let host_list = hosts::load(&args.hosts_file)?;

    let deployer = ScriptDeployer::from_config(&config);
    let agent_query = KubectlAgentQuery::from_config(&config.verify);

    // Printed whether or not stderr is a terminal.
    let progress = |line: &str| eprintln!("[deploy] {}", line);

    let mut rollout = Rollout::new(&config, &deployer).with_progress(&progress);
    if config.verify.enabled {
        rollout = rollout.with_agent_query(&agent_query);
    }

    let report = rollout.run(&host_list).map_err(|e| {
        if e.code.is_infrastructure() {
            e.with_hint("Set 'deploy_script' in config.json or pass --deploy-script <PATH>")
        } else {
            e
        }
    })?;

    let exit_code = report.exit_code();
    let text = report.render_text();
    let report = serde_json::to_value(&report)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize report".to_string())))?;

    Ok((
        DeployOutput {
            command: "deploy".to_string(),
            hosts_file: args.hosts_file.display().to_string(),
            report,
            text,
        },
        exit_code,
    ))
}
