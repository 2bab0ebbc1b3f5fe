use clap::{Args, Subcommand};
use serde::Serialize;

use agent_rollout::config::{ConfigOverrides, RolloutConfig};
use agent_rollout::paths;

use super::{CmdResult, GlobalArgs};
use crate::output::TextOutput;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display the resolved configuration (default)
    Show {
        /// Show only built-in defaults (ignore config.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Show the path to the global config.json
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<RolloutConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
}

impl TextOutput for ConfigOutput {
    fn render_text(&self) -> String {
        if let Some(config) = &self.config {
            return match serde_json::to_string_pretty(config) {
                Ok(json) => format!("{}\n", json),
                Err(e) => format!("<unprintable config: {}>\n", e),
            };
        }

        match (&self.path, self.exists) {
            (Some(path), Some(false)) => format!("{} (not created)\n", path),
            (Some(path), _) => format!("{}\n", path),
            _ => String::new(),
        }
    }
}

pub fn run(args: ConfigArgs, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command.unwrap_or(ConfigCommand::Show { builtin: false }) {
        ConfigCommand::Show { builtin } => show(builtin, global),
        ConfigCommand::Path => path(global),
    }
}

fn show(builtin: bool, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let config = if builtin {
        RolloutConfig::default()
    } else {
        global.resolve_config(ConfigOverrides::default())?
    };

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(config.redacted()),
            path: None,
            exists: None,
        },
        0,
    ))
}

fn path(global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => paths::config_json()
            .map_err(|e| e.with_hint("Set HOME or pass --config <PATH>"))?,
    };

    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            exists: Some(path.exists()),
            path: Some(path.display().to_string()),
            config: None,
        },
        0,
    ))
}
