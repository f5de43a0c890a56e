//! Blocking, timeout-bounded invocations of the external proving toolchain.

use std::ffi::OsString;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::PROCESS_POLL_INTERVAL_MS;
use crate::pipeline::ZkError;

/// Toolchain phases; each runs as one subprocess with its own timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Build,
    Setup,
    Prove,
    Verify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Build => write!(f, "build"),
            Phase::Setup => write!(f, "setup"),
            Phase::Prove => write!(f, "proving"),
            Phase::Verify => write!(f, "verification"),
        }
    }
}

/// Describes one toolchain invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolchainCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Bytes piped to the process's stdin, which is closed afterwards.
    pub stdin: Option<Vec<u8>>,
}

impl ToolchainCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends `flag` followed by a path.
    pub fn path_arg(self, flag: &str, path: &Path) -> Self {
        self.arg(flag).arg(path.as_os_str())
    }

    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    fn spawn(&self) -> std::io::Result<Child> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.stdin(if self.stdin.is_some() { Stdio::piped() } else { Stdio::null() });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.spawn()
    }

    /// Runs the command to completion, killing it once `timeout` elapses.
    ///
    /// A non-zero exit is not an error here; callers decide what it means for
    /// their phase.
    pub fn run(&self, phase: Phase, timeout: Duration) -> Result<CommandOutput, ZkError> {
        debug!(%phase, program = %self.program.display(), ?timeout, "spawning toolchain");
        let started = Instant::now();
        let mut child = self.spawn().map_err(|source| ZkError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let feeder = match (child.stdin.take(), self.stdin.clone()) {
            (Some(mut pipe), Some(bytes)) => Some(thread::spawn(move || {
                // The process may exit without draining stdin.
                let _ = pipe.write_all(&bytes);
            })),
            _ => None,
        };
        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());

        // Reader threads are left detached on early returns: grandchildren may still hold the pipes.
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    warn!(%phase, %err, "lost track of toolchain process, killing");
                    terminate(&mut child, phase);
                    return Err(err.into());
                }
            }
            if started.elapsed() >= timeout {
                warn!(%phase, program = %self.program.display(), ?timeout, "toolchain timed out, killing");
                terminate(&mut child, phase);
                return Err(ZkError::Timeout { phase, timeout });
            }
            thread::sleep(Duration::from_millis(PROCESS_POLL_INTERVAL_MS));
        };

        if let Some(feeder) = feeder {
            let _ = feeder.join();
        }
        let output = CommandOutput {
            status,
            stdout: collect(stdout),
            stderr: String::from_utf8_lossy(&collect(stderr)).trim().to_string(),
        };
        debug!(%phase, code = ?status.code(), elapsed = ?started.elapsed(), "toolchain exited");
        Ok(output)
    }
}

/// Captured result of a finished toolchain process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// The toolchain's diagnostic: stderr, or a note on the exit status when silent.
    pub fn diagnostic(&self) -> String {
        if self.stderr.is_empty() {
            format!("toolchain exited with {}", self.status)
        } else {
            self.stderr.clone()
        }
    }
}

/// Kills the child and reaps it so no zombie outlives the call.
fn terminate(child: &mut Child, phase: Phase) {
    if let Err(err) = child.kill() {
        warn!(%phase, %err, "failed to kill toolchain process");
    }
    if let Err(err) = child.wait() {
        warn!(%phase, %err, "failed to reap toolchain process");
    }
}

fn capture<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|handle| handle.join().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolchainCommand {
        ToolchainCommand::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let output = sh("printf proof; echo oops >&2")
            .run(Phase::Prove, Duration::from_secs(5))
            .expect("run");
        assert!(output.success());
        assert_eq!(output.stdout, b"proof");
        assert_eq!(output.stderr, "oops");
    }

    #[test]
    fn pipes_stdin() {
        let output = sh("cat")
            .stdin(b"abc".to_vec())
            .run(Phase::Verify, Duration::from_secs(5))
            .expect("run");
        assert_eq!(output.stdout, b"abc");
    }

    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let output = sh("exit 3").run(Phase::Build, Duration::from_secs(5)).expect("run");
        assert!(!output.success());
        assert!(output.diagnostic().contains('3'));
    }

    #[test]
    fn timeout_kills_the_process() {
        let started = Instant::now();
        let err = sh("exec sleep 5")
            .run(Phase::Setup, Duration::from_millis(200))
            .expect_err("should time out");
        assert!(matches!(err, ZkError::Timeout { phase: Phase::Setup, .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn terminated_child_is_reaped() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("exec sleep 5")
            .spawn()
            .expect("spawn");
        terminate(&mut child, Phase::Prove);
        let status = child.try_wait().expect("status").expect("child already reaped");
        assert!(!status.success());

        // A second terminate on a reaped child only logs.
        terminate(&mut child, Phase::Prove);
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let err = ToolchainCommand::new("/nonexistent/zk-toolchain")
            .run(Phase::Build, Duration::from_secs(1))
            .expect_err("spawn should fail");
        assert!(matches!(err, ZkError::Spawn { .. }));
    }
}
