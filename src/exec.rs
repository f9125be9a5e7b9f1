//! Bounded execution of the external ffmpeg/ffprobe binaries.
//!
//! Every wait has a deadline: a child that outlives it is killed and the
//! caller gets a timeout error instead of a hang. Stdout and stderr are
//! drained on threads so a chatty child can never fill a pipe and stall.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{PitchlineError, PitchlineResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Check that `bin -version` runs and exits successfully.
pub fn responds_to_version(bin: &Path) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Resolve the ffmpeg binary: an explicit path when configured, otherwise
/// `ffmpeg` from `PATH`. Absence is a configuration error, detected before
/// any expensive work.
pub fn locate_ffmpeg(explicit: Option<&Path>) -> PitchlineResult<PathBuf> {
    let candidate = explicit.unwrap_or_else(|| Path::new("ffmpeg"));
    if responds_to_version(candidate) {
        Ok(candidate.to_path_buf())
    } else {
        Err(PitchlineError::validation(format!(
            "unable to locate a working ffmpeg at '{}' (use --ffmpeg to point at the binary)",
            candidate.display()
        )))
    }
}

pub fn drain_on_thread<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

pub fn join_drained(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// Poll the child until it exits or `timeout` elapses; on expiry the child
/// is killed and a timeout error naming `what` is returned.
pub fn wait_with_timeout(
    child: &mut Child,
    what: &str,
    timeout: Duration,
) -> PitchlineResult<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                return Err(PitchlineError::process(
                    what,
                    format!("failed to wait for child: {e}"),
                ));
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PitchlineError::timeout(what, timeout.as_secs()));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Run `cmd` to completion with captured stdio and a bounded wait. A
/// non-zero exit surfaces the captured stderr as the failure detail.
pub fn run_captured(
    mut cmd: Command,
    what: &str,
    timeout: Duration,
) -> PitchlineResult<ExecOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| PitchlineError::process(what, format!("failed to spawn: {e}")))?;

    let stdout: Option<ChildStdout> = child.stdout.take();
    let stderr: Option<ChildStderr> = child.stderr.take();
    let stdout_thread = stdout.map(drain_on_thread);
    let stderr_thread = stderr.map(drain_on_thread);

    let status = wait_with_timeout(&mut child, what, timeout)?;

    let stdout = stdout_thread.map(join_drained).unwrap_or_default();
    let stderr = stderr_thread.map(join_drained).unwrap_or_default();

    if !status.success() {
        return Err(PitchlineError::process(
            what,
            format!(
                "exited with {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            ),
        ));
    }

    Ok(ExecOutput { stdout, stderr })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binaries_fail_validation() {
        let err = locate_ffmpeg(Some(Path::new("/nonexistent/ffmpeg"))).unwrap_err();
        assert!(err.to_string().contains("unable to locate"));
    }

    #[test]
    fn run_captured_collects_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf hello"]);
        let out = run_captured(cmd, "sh", Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout, b"hello");
    }

    #[test]
    fn run_captured_surfaces_nonzero_exits() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        let err = run_captured(cmd, "sh", Duration::from_secs(5)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sh failed"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[test]
    fn slow_children_hit_the_deadline() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err = run_captured(cmd, "sleep", Duration::from_millis(80)).unwrap_err();
        assert!(matches!(
            err,
            PitchlineError::ExternalProcessTimeout { .. }
        ));
    }
}
