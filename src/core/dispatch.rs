//! Bounded-concurrency dispatch of host tasks.
//!
//! `parallel` worker threads claim tasks from a shared cursor, so tasks are
//! admitted in input order and at most `parallel` run at once. Every task
//! produces exactly one [`DeploymentResult`], sent over a channel to the
//! calling thread, which is the only consumer.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use crate::deployer::{DeployOutcome, HostDeployer};
use crate::hosts::HostTask;
use crate::report::DeploymentResult;
use crate::utils::io;

pub struct Dispatcher<'d> {
    deployer: &'d dyn HostDeployer,
    parallel: usize,
}

impl<'d> Dispatcher<'d> {
    /// `parallel` below 1 is treated as 1.
    pub fn new(deployer: &'d dyn HostDeployer, parallel: usize) -> Self {
        Self {
            deployer,
            parallel: parallel.max(1),
        }
    }

    /// Run every task and collect the results in completion order.
    pub fn run<'a>(
        &self,
        tasks: &'a [HostTask],
        log_paths: &[PathBuf],
    ) -> Vec<DeploymentResult<'a>> {
        let mut results = Vec::with_capacity(tasks.len());
        self.run_with(tasks, log_paths, |result| results.push(result));
        results
    }

    /// Run every task, handing each result to `on_complete` on the calling
    /// thread as soon as it is produced. Returns once all tasks are done.
    ///
    /// `log_paths[i]` is the log file for `tasks[i]`.
    pub fn run_with<'a, F>(
        &self,
        tasks: &'a [HostTask],
        log_paths: &[PathBuf],
        mut on_complete: F,
    ) where
        F: FnMut(DeploymentResult<'a>),
    {
        debug_assert_eq!(
            tasks.len(),
            log_paths.len(),
            "one log path is required per task"
        );

        if tasks.is_empty() {
            return;
        }

        let workers = self.parallel.min(tasks.len());
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        tracing::info!(tasks = tasks.len(), workers, "dispatching host tasks");

        thread::scope(|scope| {
            for worker in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let deployer = self.deployer;

                scope.spawn(move || loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(task) = tasks.get(index) else {
                        break;
                    };

                    tracing::debug!(worker, sequence = index + 1, host = %task.host, "admitted");

                    let result = run_task(deployer, index + 1, task, &log_paths[index]);
                    if tx.send(result).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for result in rx {
                on_complete(result);
            }
        });
    }
}

/// Run one task to completion. Never fails: every problem becomes a
/// `Failure` result.
fn run_task<'a>(
    deployer: &dyn HostDeployer,
    sequence_index: usize,
    task: &'a HostTask,
    log_path: &Path,
) -> DeploymentResult<'a> {
    let started = Instant::now();

    let outcome = match io::create_file(log_path, "create host log") {
        Ok(log) => {
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| deployer.deploy(task, &log)));
            let outcome = match attempt {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => DeployOutcome::failed(err.describe()),
                Err(payload) => DeployOutcome::failed(format!(
                    "deploy operation panicked: {}",
                    panic_message(payload.as_ref())
                )),
            };

            if let Some(error) = &outcome.error {
                let note = format!("\n# deployment failed: {}\n", error);
                let _ = io::append(&log, &note, "write host log");
            }
            outcome
        }
        Err(err) => DeployOutcome::failed(err.describe()),
    };

    let result = DeploymentResult::new(
        sequence_index,
        task,
        log_path.to_path_buf(),
        outcome,
        started.elapsed(),
    );

    tracing::info!(
        sequence = sequence_index,
        host = %task.host,
        label = %task.label,
        status = result.status.as_str(),
        duration_ms = result.duration_ms,
        "host task finished"
    );

    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
