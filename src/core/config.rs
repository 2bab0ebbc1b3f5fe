//! Run configuration.
//!
//! Everything a run needs is resolved into one [`RolloutConfig`] before any
//! host is dispatched: file values first, then command-line overrides, then
//! validation. Nothing is read from the ambient environment afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

/// Root configuration structure for config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Single-host deploy executable, invoked as `<script> <host> <label> <group>`.
    #[serde(default = "default_deploy_script")]
    pub deploy_script: String,

    /// Maximum number of hosts deployed at the same time.
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Per-host deadline. `None` lets a stuck host hold its slot forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_timeout_secs: Option<u64>,

    /// Directory receiving the summary log and per-host logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub manager: ManagerConfig,

    /// Extra environment exported to every deploy script invocation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub verify: VerifyConfig,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            deploy_script: default_deploy_script(),
            parallel: default_parallel(),
            task_timeout_secs: None,
            log_dir: default_log_dir(),
            manager: ManagerConfig::default(),
            env: BTreeMap::new(),
            verify: VerifyConfig::default(),
        }
    }
}

/// Where agents register. Exported to the deploy script as environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_password: Option<String>,
}

/// Post-run query listing the agents the manager knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_kubectl")]
    pub kubectl: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_manager_pod")]
    pub manager_pod: String,

    #[serde(default = "default_agent_list_command")]
    pub command: Vec<String>,

    /// The query is killed after this many seconds and reported as a warning.
    #[serde(default = "default_verify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kubectl: default_kubectl(),
            namespace: default_namespace(),
            manager_pod: default_manager_pod(),
            command: default_agent_list_command(),
            timeout_secs: default_verify_timeout_secs(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub deploy_script: Option<String>,
    pub parallel: Option<usize>,
    pub task_timeout_secs: Option<u64>,
    pub log_dir: Option<String>,
    pub manager_address: Option<String>,
    pub skip_verify: bool,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_deploy_script() -> String {
    "./deploy-agent.sh".to_string()
}

fn default_parallel() -> usize {
    1
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_true() -> bool {
    true
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_namespace() -> String {
    "wazuh".to_string()
}

fn default_manager_pod() -> String {
    "wazuh-manager-master-0".to_string()
}

fn default_agent_list_command() -> Vec<String> {
    vec!["/var/ossec/bin/agent_control".to_string(), "-l".to_string()]
}

fn default_verify_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Resolution
// =============================================================================

impl RolloutConfig {
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(script) = overrides.deploy_script {
            self.deploy_script = script;
        }
        if let Some(parallel) = overrides.parallel {
            self.parallel = parallel;
        }
        if let Some(secs) = overrides.task_timeout_secs {
            self.task_timeout_secs = Some(secs);
        }
        if let Some(dir) = overrides.log_dir {
            self.log_dir = dir;
        }
        if let Some(address) = overrides.manager_address {
            self.manager.address = Some(address);
        }
        if overrides.skip_verify {
            self.verify.enabled = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallel == 0 {
            return Err(Error::config_invalid_value(
                "parallel",
                Some("0".to_string()),
                "parallel must be at least 1",
            ));
        }

        if self.task_timeout_secs == Some(0) {
            return Err(Error::config_invalid_value(
                "task_timeout_secs",
                Some("0".to_string()),
                "timeout must be at least 1 second; omit it to disable",
            ));
        }

        if self.deploy_script.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "deploy_script",
                None,
                "deploy script path cannot be empty",
            ));
        }

        if self.verify.timeout_secs == 0 {
            return Err(Error::config_invalid_value(
                "verify.timeout_secs",
                Some("0".to_string()),
                "agent list timeout must be at least 1 second",
            ));
        }

        if self.verify.enabled && self.verify.command.is_empty() {
            return Err(Error::config_invalid_value(
                "verify.command",
                None,
                "agent list command cannot be empty while verification is enabled",
            ));
        }

        Ok(())
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_dir_path(&self) -> PathBuf {
        paths::expand(&self.log_dir)
    }

    pub fn deploy_script_path(&self) -> PathBuf {
        paths::expand(&self.deploy_script)
    }

    /// Environment exported to the deploy script. Manager settings win over `env`.
    pub fn script_env(&self) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        if let Some(address) = &self.manager.address {
            env.insert("WAZUH_MANAGER".to_string(), address.clone());
        }
        if let Some(password) = &self.manager.registration_password {
            env.insert("WAZUH_REGISTRATION_PASSWORD".to_string(), password.clone());
        }
        env
    }

    /// Copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.manager.registration_password.is_some() {
            copy.manager.registration_password = Some("********".to_string());
        }
        copy
    }
}

// =============================================================================
// Loading functions
// =============================================================================

/// Parse config.json content.
pub fn parse(content: &str, source: &str) -> Result<RolloutConfig> {
    serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))
}

/// Load a config file that must exist.
pub fn load_from(path: &Path) -> Result<RolloutConfig> {
    let source = path.display().to_string();
    let content = io::read_file(path, "read config")
        .map_err(|e| Error::config_file_unreadable(&source, e.describe()))?;
    parse(&content, &source)
}

/// Resolve the run configuration once.
///
/// An explicit path must exist and parse. Without one, the global
/// config.json is used when present, otherwise built-in defaults.
pub fn resolve(explicit: Option<&Path>, overrides: ConfigOverrides) -> Result<RolloutConfig> {
    let mut config = match explicit {
        Some(path) => load_from(path)?,
        None => match paths::config_json() {
            Ok(path) if path.exists() => load_from(&path)?,
            _ => RolloutConfig::default(),
        },
    };

    config.apply(overrides);
    config.validate()?;

    tracing::debug!(
        parallel = config.parallel,
        timeout = ?config.task_timeout_secs,
        deploy_script = %config.deploy_script,
        "resolved configuration"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_sequential_run() {
        let config = RolloutConfig::default();

        assert_eq!(config.parallel, 1);
        assert_eq!(config.task_timeout(), None);
        assert_eq!(config.deploy_script, "./deploy-agent.sh");
        assert!(config.verify.enabled);
        assert_eq!(config.verify.namespace, "wazuh");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_fills_missing_fields_with_defaults() {
        let config = parse(r#"{ "parallel": 4, "verify": { "namespace": "security" } }"#, "t")
            .unwrap();

        assert_eq!(config.parallel, 4);
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.verify.namespace, "security");
        assert_eq!(config.verify.manager_pod, "wazuh-manager-master-0");
        assert_eq!(config.verify.timeout_secs, 30);
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = parse("{ parallel: ", "broken.json").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
        assert_eq!(err.details["path"], "broken.json");
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = parse(r#"{ "parallel": 4, "log_dir": "/var/log/rollout" }"#, "t")
            .unwrap();

        config.apply(ConfigOverrides {
            parallel: Some(8),
            task_timeout_secs: Some(600),
            manager_address: Some("wazuh.example.com".to_string()),
            skip_verify: true,
            ..Default::default()
        });

        assert_eq!(config.parallel, 8);
        assert_eq!(config.log_dir, "/var/log/rollout");
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.manager.address.as_deref(), Some("wazuh.example.com"));
        assert!(!config.verify.enabled);
    }

    #[test]
    fn validate_rejects_zero_parallel() {
        let config = RolloutConfig {
            parallel: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "parallel");
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = RolloutConfig {
            task_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_verify_timeout() {
        let mut config = RolloutConfig::default();
        config.verify.timeout_secs = 0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.details["key"], "verify.timeout_secs");
    }

    #[test]
    fn script_env_exports_manager_settings() {
        let mut config = RolloutConfig::default();
        config.env.insert("WAZUH_MANAGER".to_string(), "stale".to_string());
        config.env.insert("AGENT_VERSION".to_string(), "4.7.2".to_string());
        config.manager.address = Some("10.0.0.2".to_string());
        config.manager.registration_password = Some("s3cret".to_string());

        let env = config.script_env();
        assert_eq!(env["WAZUH_MANAGER"], "10.0.0.2");
        assert_eq!(env["WAZUH_REGISTRATION_PASSWORD"], "s3cret");
        assert_eq!(env["AGENT_VERSION"], "4.7.2");
    }

    #[test]
    fn redacted_masks_password() {
        let mut config = RolloutConfig::default();
        config.manager.registration_password = Some("s3cret".to_string());

        let shown = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn resolve_requires_explicit_file_to_exist() {
        let err = resolve(
            Some(Path::new("/nonexistent/config.json")),
            ConfigOverrides::default(),
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "config.file_unreadable");
        assert!(err.code.is_configuration());
    }

    #[test]
    fn resolve_applies_overrides_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "parallel": 2, "task_timeout_secs": 30 }"#).unwrap();

        let config = resolve(
            Some(&path),
            ConfigOverrides {
                parallel: Some(5),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.parallel, 5);
        assert_eq!(config.task_timeout_secs, Some(30));
    }

    #[test]
    fn resolve_validates_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();

        let err = resolve(
            Some(&path),
            ConfigOverrides {
                parallel: Some(0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.code.is_configuration());
    }
}
