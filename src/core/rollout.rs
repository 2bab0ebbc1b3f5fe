//! One bulk deployment run, end to end.

use chrono::Local;

use crate::artifacts::RunLogs;
use crate::config::RolloutConfig;
use crate::deployer::HostDeployer;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::hosts::HostList;
use crate::report::{Report, ResultCollector, RunInfo};
use crate::verify::{self, AgentQuery};

pub struct Rollout<'d> {
    config: &'d RolloutConfig,
    deployer: &'d dyn HostDeployer,
    agent_query: Option<&'d dyn AgentQuery>,
    progress: Option<&'d dyn Fn(&str)>,
}

impl<'d> Rollout<'d> {
    pub fn new(config: &'d RolloutConfig, deployer: &'d dyn HostDeployer) -> Self {
        Self {
            config,
            deployer,
            agent_query: None,
            progress: None,
        }
    }

    /// Query run after all hosts finish. Its result is informational only.
    pub fn with_agent_query(mut self, query: &'d dyn AgentQuery) -> Self {
        self.agent_query = Some(query);
        self
    }

    /// Receives each `[k/N]` progress line on the calling thread. Without
    /// one, progress goes through `log_status!`.
    pub fn with_progress(mut self, progress: &'d dyn Fn(&str)) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report_progress(&self, line: &str) {
        match self.progress {
            Some(progress) => progress(line),
            None => log_status!("deploy", "{}", line),
        }
    }

    /// Deploy to every host in `hosts` and build the report.
    ///
    /// Errors are only returned before dispatch starts (empty host list,
    /// failed deployer preflight, log directory not writable). Once hosts
    /// are dispatched the run always completes with a report.
    pub fn run<'a>(&self, hosts: &'a HostList) -> Result<Report<'a>> {
        if hosts.is_empty() {
            return Err(Error::host_list_empty("<host list>", hosts.warnings.clone()));
        }

        self.deployer.preflight()?;

        let log_dir = self.config.log_dir_path();
        let logs = RunLogs::create(&log_dir, Local::now(), &hosts.tasks)?;

        let timeout = self
            .config
            .task_timeout_secs
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "none".to_string());
        let header = format!(
            "Deploying to {} host(s), parallel {}, timeout {}, logs in {}",
            hosts.len(),
            self.config.parallel,
            timeout,
            logs.dir().display()
        );
        log_status!("deploy", "{}", header);
        tracing::info!(run = logs.stamp(), "{}", header);
        logs.append_summary(&format!("{}\n", header));
        for warning in &hosts.warnings {
            logs.append_summary(&format!("warning: {}\n", warning));
        }

        let mut collector = ResultCollector::new(hosts.len());
        Dispatcher::new(self.deployer, self.config.parallel).run_with(
            &hosts.tasks,
            logs.host_logs(),
            |result| {
                let line = collector.record(result);
                self.report_progress(&line);
                logs.append_summary(&format!("{}\n", line));
            },
        );

        let mut report = collector.finish(hosts.warnings.clone()).with_run(RunInfo {
            stamp: logs.stamp().to_string(),
            parallel: self.config.parallel,
            task_timeout_secs: self.config.task_timeout_secs,
            log_dir: logs.dir().to_path_buf(),
            summary_log: logs.summary_path().to_path_buf(),
        });

        logs.append_summary("\n");
        logs.append_summary(&report.render_text());

        if let Some(query) = self.agent_query {
            log_status!("verify", "Listing registered agents");
            let verification = verify::verify(query);
            logs.append_summary("\n");
            logs.append_summary(&verification.render_text());
            report = report.with_verification(verification);
        }

        tracing::info!(
            total = report.summary.total,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            "bulk deployment finished"
        );

        Ok(report)
    }
}
