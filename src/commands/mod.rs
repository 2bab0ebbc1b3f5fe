use std::path::PathBuf;

use agent_rollout::config::{ConfigOverrides, RolloutConfig};

pub type CmdResult<T> = agent_rollout::Result<(T, i32)>;

/// Flags shared by every subcommand.
pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// Load, override and validate the run configuration.
    pub fn resolve_config(
        &self,
        overrides: ConfigOverrides,
    ) -> agent_rollout::Result<RolloutConfig> {
        agent_rollout::config::resolve(self.config.as_deref(), overrides)
    }
}

pub mod agents;
pub mod config;
pub mod deploy;
pub mod hosts;

/// Run a command and print its result in the selected output mode.
macro_rules! dispatch {
    ($args:expr, $global:expr, $json:expr, $module:ident) => {
        crate::output::emit($module::run($args, $global), $json)
    };
}

pub(crate) fn run(command: crate::Commands, global: &GlobalArgs, json: bool) -> i32 {
    match command {
        crate::Commands::Deploy(args) => dispatch!(args, global, json, deploy),
        crate::Commands::Hosts(args) => dispatch!(args, global, json, hosts),
        crate::Commands::Agents(args) => dispatch!(args, global, json, agents),
        crate::Commands::Config(args) => dispatch!(args, global, json, config),
    }
}
