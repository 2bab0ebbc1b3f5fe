//! Per-host results and the consolidated run report.
//!
//! Results arrive in completion order; the report is always presented in
//! input order.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::deployer::DeployOutcome;
use crate::hosts::HostTask;
use crate::verify::Verification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Success,
    Failure,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Success => "SUCCESS",
            DeploymentStatus::Failure => "FAILURE",
        }
    }
}

/// Outcome of one host task. Created once, when its operation terminates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult<'a> {
    pub sequence_index: usize,
    pub task: &'a HostTask,
    pub status: DeploymentStatus,
    pub log_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl<'a> DeploymentResult<'a> {
    pub fn new(
        sequence_index: usize,
        task: &'a HostTask,
        log_path: PathBuf,
        outcome: DeployOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            sequence_index,
            task,
            status: if outcome.success {
                DeploymentStatus::Success
            } else {
                DeploymentStatus::Failure
            },
            log_path,
            exit_code: outcome.exit_code,
            error: outcome.error,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeploymentStatus::Success
    }

    /// Why the host failed, in one short phrase.
    pub fn failure_reason(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        match (&self.error, self.exit_code) {
            (Some(error), _) => Some(error.clone()),
            (None, Some(code)) => Some(format!("exit code {}", code)),
            (None, None) => Some("unknown failure".to_string()),
        }
    }

    fn seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Summary of bulk operation results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Identifies the artifacts of the run a report belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub stamp: String,
    pub parallel: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_timeout_secs: Option<u64>,
    pub log_dir: PathBuf,
    pub summary_log: PathBuf,
}

/// Single consumer of dispatched results.
#[derive(Debug)]
pub struct ResultCollector<'a> {
    total: usize,
    results: Vec<DeploymentResult<'a>>,
}

impl<'a> ResultCollector<'a> {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            results: Vec::with_capacity(total),
        }
    }

    /// Store a result and return its live progress line.
    pub fn record(&mut self, result: DeploymentResult<'a>) -> String {
        let line = progress_line(&result, self.results.len() + 1, self.total);
        self.results.push(result);
        line
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn finish(self, warnings: Vec<String>) -> Report<'a> {
        Report::new(self.results, warnings)
    }
}

fn progress_line(result: &DeploymentResult<'_>, completed: usize, total: usize) -> String {
    let mut line = format!(
        "[{}/{}] {} ({}): {} in {:.1}s",
        completed,
        total,
        result.task.label,
        result.task.host,
        result.status.as_str(),
        result.seconds()
    );
    if let Some(reason) = result.failure_reason() {
        let _ = write!(line, " ({}), log: {}", reason, result.log_path.display());
    }
    line
}

/// Consolidated outcome of one run, ordered by input position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunInfo>,
    pub results: Vec<DeploymentResult<'a>>,
    pub summary: BulkSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl<'a> Report<'a> {
    pub fn new(mut results: Vec<DeploymentResult<'a>>, warnings: Vec<String>) -> Self {
        results.sort_by_key(|r| r.sequence_index);

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let summary = BulkSummary {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        };

        Self {
            run: None,
            results,
            summary,
            warnings,
            verification: None,
        }
    }

    pub fn with_run(mut self, run: RunInfo) -> Self {
        self.run = Some(run);
        self
    }

    pub fn with_verification(mut self, verification: Verification) -> Self {
        self.verification = Some(verification);
        self
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeploymentResult<'a>> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }

    /// 0 when every host succeeded, 1 otherwise. Verification never counts.
    pub fn exit_code(&self) -> i32 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }

    /// Human-readable report. Pure function of the report's contents.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let title = match &self.run {
            Some(run) => format!("Bulk deployment report (run {})", run.stamp),
            None => "Bulk deployment report".to_string(),
        };
        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "{}", "=".repeat(title.len()));

        if let Some(run) = &self.run {
            let timeout = run
                .task_timeout_secs
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "none".to_string());
            let _ = writeln!(
                out,
                "parallel: {}  timeout: {}  summary log: {}",
                run.parallel,
                timeout,
                run.summary_log.display()
            );
        }
        out.push('\n');

        self.render_table(&mut out);

        let _ = writeln!(
            out,
            "\nTotal: {}  Succeeded: {}  Failed: {}",
            self.summary.total, self.summary.succeeded, self.summary.failed
        );

        if self.summary.failed > 0 {
            out.push_str("\nFailed hosts:\n");
            for result in self.failures() {
                let _ = writeln!(
                    out,
                    "  - {} ({}): {}\n    log: {}",
                    result.task.label,
                    result.task.host,
                    result.failure_reason().unwrap_or_default(),
                    result.log_path.display()
                );
            }
        }

        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in &self.warnings {
                let _ = writeln!(out, "  - {}", warning);
            }
        }

        if let Some(verification) = &self.verification {
            out.push('\n');
            out.push_str(&verification.render_text());
        }

        out
    }

    fn render_table(&self, out: &mut String) {
        let headers = ["#", "STATUS", "LABEL", "HOST", "GROUP", "TIME"];
        let rows: Vec<[String; 6]> = self
            .results
            .iter()
            .map(|r| {
                [
                    r.sequence_index.to_string(),
                    r.status.as_str().to_string(),
                    r.task.label.clone(),
                    r.task.host.clone(),
                    r.task.group.clone(),
                    format!("{:.1}s", r.seconds()),
                ]
            })
            .collect();

        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let render_row = |cells: &[&str]| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect();
            padded.join("  ").trim_end().to_string()
        };

        let _ = writeln!(out, "{}", render_row(&headers));
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            let _ = writeln!(out, "{}", render_row(&cells));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks() -> Vec<HostTask> {
        vec![
            HostTask::new("h1", Some("label1".into()), Some("g1".into())),
            HostTask::new("h2", None, Some("g2".into())),
            HostTask::new("h3", None, None),
        ]
    }

    fn result<'a>(tasks: &'a [HostTask], index: usize, success: bool) -> DeploymentResult<'a> {
        let outcome = if success {
            DeployOutcome::succeeded()
        } else {
            DeployOutcome::from_exit_code(1)
        };
        DeploymentResult::new(
            index,
            &tasks[index - 1],
            PathBuf::from(format!("logs/deployment_{}.log", tasks[index - 1].label)),
            outcome,
            Duration::from_millis(1500),
        )
    }

    #[test]
    fn collector_numbers_progress_in_completion_order() {
        let tasks = tasks();
        let mut collector = ResultCollector::new(3);

        let first = collector.record(result(&tasks, 2, false));
        let second = collector.record(result(&tasks, 1, true));

        assert_eq!(
            first,
            "[1/3] h2 (h2): FAILURE in 1.5s (exit code 1), log: logs/deployment_h2.log"
        );
        assert_eq!(second, "[2/3] label1 (h1): SUCCESS in 1.5s");
        assert_eq!(collector.completed(), 2);
    }

    #[test]
    fn report_sorts_by_input_position() {
        let tasks = tasks();
        let report = Report::new(
            vec![
                result(&tasks, 3, true),
                result(&tasks, 1, true),
                result(&tasks, 2, false),
            ],
            Vec::new(),
        );

        let order: Vec<usize> = report.results.iter().map(|r| r.sequence_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn summary_counts_reconcile() {
        let tasks = tasks();
        let report = Report::new(
            vec![
                result(&tasks, 1, true),
                result(&tasks, 2, false),
                result(&tasks, 3, true),
            ],
            Vec::new(),
        );

        assert_eq!(
            report.summary,
            BulkSummary {
                total: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(report.summary.succeeded + report.summary.failed, report.summary.total);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn all_success_exits_zero() {
        let tasks = tasks();
        let report = Report::new(vec![result(&tasks, 1, true)], Vec::new());
        assert!(report.all_succeeded());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn render_names_each_failed_host_with_log() {
        let tasks = tasks();
        let report = Report::new(
            vec![result(&tasks, 1, true), result(&tasks, 2, false)],
            vec!["line 4: empty host (',x')".to_string()],
        );

        let text = report.render_text();

        assert!(text.contains("Failed hosts:\n  - h2 (h2): exit code 1\n    log: logs/deployment_h2.log"));
        assert!(text.contains("Total: 2  Succeeded: 1  Failed: 1"));
        assert!(text.contains("Warnings:\n  - line 4: empty host (',x')"));
    }

    #[test]
    fn render_table_aligns_columns() {
        let tasks = tasks();
        let report = Report::new(vec![result(&tasks, 1, true), result(&tasks, 3, true)], Vec::new());

        let text = report.render_text();

        assert!(text.contains("#  STATUS   LABEL   HOST  GROUP    TIME\n"));
        assert!(text.contains("1  SUCCESS  label1  h1    g1       1.5s\n"));
        assert!(text.contains("3  SUCCESS  h3      h3    default  1.5s\n"));
        assert!(!text.contains("Failed hosts"));
    }

    #[test]
    fn render_is_idempotent() {
        let tasks = tasks();
        let report = Report::new(
            vec![result(&tasks, 2, false), result(&tasks, 1, true)],
            vec!["line 9: empty host (',')".to_string()],
        );

        assert_eq!(report.render_text(), report.render_text());
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let tasks = tasks();
        let report = Report::new(vec![result(&tasks, 2, false)], Vec::new());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["results"][0]["sequenceIndex"], 2);
        assert_eq!(value["results"][0]["status"], "failure");
        assert_eq!(value["results"][0]["task"]["group"], "g2");
        assert_eq!(value["summary"]["failed"], 1);
        assert!(value.get("verification").is_none());
    }
}
