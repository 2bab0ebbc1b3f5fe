//! Command execution primitives with consistent error handling.

use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::utils::shell;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run a command and return its stdout on success.
///
/// A program that cannot be started maps to `infra.tool_missing`; a non-zero
/// exit maps to `infra.command_failed` carrying stderr (or stdout fallback).
pub fn run(program: &str, args: &[String]) -> Result<String> {
    let display = command_line(program, args);

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| spawn_error(program, &display, e))?;

    stdout_or_error(display, output)
}

/// Like [`run`], but the command and everything it started are killed once
/// `timeout` elapses. A timeout is an `infra.command_failed` error.
pub fn run_with_timeout(program: &str, args: &[String], timeout: Duration) -> Result<String> {
    let display = command_line(program, args);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    isolate_process_group(&mut command);

    let mut child = command
        .spawn()
        .map_err(|e| spawn_error(program, &display, e))?;

    let stdout = child.stdout.take().map(read_in_background);
    let stderr = child.stderr.take().map(read_in_background);

    let status = match wait_until(&mut child, Instant::now() + timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            kill_process_group(&mut child);
            return Err(Error::command_failed(
                display,
                None,
                format!("timed out after {}s", timeout.as_secs()),
            ));
        }
        Err(err) => {
            kill_process_group(&mut child);
            return Err(err);
        }
    };

    let output = Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    stdout_or_error(display, output)
}

/// Start the child as leader of a new process group, so
/// [`kill_process_group`] reaches everything it spawns.
pub fn isolate_process_group(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

/// Poll `child` until it exits or `deadline` passes. `Ok(None)` means it is
/// still running.
pub fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        let polled = child
            .try_wait()
            .map_err(|e| Error::internal_io(e.to_string(), Some("poll child process".into())))?;
        if polled.is_some() {
            return Ok(polled);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill a child started with [`isolate_process_group`] together with its
/// descendants, then reap it.
pub fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill(2) touches no memory. The child is not reaped yet,
            // so its pid still names the group it leads.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }

    // Already-exited races are harmless; kill only errors then.
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_error(program: &str, display: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::tool_missing(program, "not found on PATH")
    } else {
        Error::command_failed(display, None, err.to_string())
    }
}

fn stdout_or_error(display: String, output: Output) -> Result<String> {
    if !output.status.success() {
        return Err(Error::command_failed(
            display,
            output.status.code(),
            error_text(&output),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn read_in_background<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

/// Render a program and its arguments as a copy-pasteable shell line.
pub fn command_line(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        return shell::quote_arg(program);
    }
    format!("{} {}", shell::quote_arg(program), shell::quote_args(args))
}

/// Resolve a program the way the OS would: paths are checked directly,
/// bare names are searched on `PATH`.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|path| path.is_file())
    })
}

/// True when the file has any execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}
