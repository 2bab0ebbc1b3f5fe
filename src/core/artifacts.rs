//! Per-run log files.
//!
//! Every artifact of one run carries the same run stamp so they can be
//! correlated afterwards: one summary log plus one log per host task.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::hosts::HostTask;
use crate::slugify::file_stem;
use crate::utils::io;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Log locations for one run. Created once, before dispatch.
#[derive(Debug)]
pub struct RunLogs {
    stamp: String,
    dir: PathBuf,
    summary_path: PathBuf,
    summary: File,
    host_logs: Vec<PathBuf>,
}

impl RunLogs {
    /// Create the log directory and the summary log, and plan one log path
    /// per task. A stamp already used in `dir` gets a numeric suffix.
    pub fn create(dir: &Path, started: DateTime<Local>, tasks: &[HostTask]) -> Result<Self> {
        io::ensure_dir(dir, "create log directory")?;

        let base = started.format(STAMP_FORMAT).to_string();
        let mut attempt = 1;
        let (stamp, summary_path, summary) = loop {
            let stamp = if attempt == 1 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let path = dir.join(summary_file_name(&stamp));

            if path.exists() {
                attempt += 1;
                continue;
            }
            match io::create_new_file(&path, "create summary log") {
                Ok(file) => break (stamp, path, file),
                // Lost a race with a concurrent run using the same stamp.
                Err(_) if path.exists() => attempt += 1,
                Err(err) => return Err(err),
            }
        };

        let host_logs = plan_host_logs(dir, &stamp, tasks);

        Ok(Self {
            stamp,
            dir: dir.to_path_buf(),
            summary_path,
            summary,
            host_logs,
        })
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    /// One planned log path per task, in input order.
    pub fn host_logs(&self) -> &[PathBuf] {
        &self.host_logs
    }

    /// Log path for the task at `sequence_index` (1-based).
    pub fn host_log_path(&self, sequence_index: usize) -> &Path {
        &self.host_logs[sequence_index - 1]
    }

    /// Append text to the summary log. Failures only warn: the summary is a
    /// convenience copy of what the terminal already shows.
    pub fn append_summary(&self, content: &str) {
        if let Err(err) = io::append(&self.summary, content, "write summary log") {
            tracing::warn!(path = %self.summary_path.display(), "{}", err.describe());
        }
    }
}

fn summary_file_name(stamp: &str) -> String {
    format!("bulk_deployment_{}.log", stamp)
}

fn plan_host_logs(dir: &Path, stamp: &str, tasks: &[HostTask]) -> Vec<PathBuf> {
    let mut used = HashSet::new();

    tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let base = file_stem(&task.label);
            let mut stem = base.clone();
            let mut suffix = idx + 1;
            while !used.insert(stem.clone()) {
                stem = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            dir.join(format!("deployment_{}_{}.log", stem, stamp))
        })
        .collect()
}
