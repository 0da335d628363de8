//! Narrow seam around external tool invocation.
//!
//! The orchestrator, prober and encoder only see [`CommandRunner`], so an
//! in-process codec or a scripted test double can stand in for the real
//! ffmpeg/ffprobe binaries.

use std::future::Future;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Per-invocation wall clock budget. Crossing `soft` logs a warning,
/// crossing `hard` kills the child process.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub soft: Duration,
    pub hard: Duration,
}

impl RunLimits {
    pub fn new(soft: Duration, hard: Duration) -> Self {
        Self { soft, hard }
    }
}

#[derive(Debug)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &ToolInvocation,
        limits: RunLimits,
    ) -> impl Future<Output = io::Result<ToolOutput>> + Send;
}

/// Runs tools as real child processes via tokio.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &ToolInvocation, limits: RunLimits) -> io::Result<ToolOutput> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout not captured"))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr not captured"))?;

        // Drain the pipes concurrently so a chatty tool cannot deadlock
        // against a full pipe buffer while we wait on it.
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let soft = tokio::time::sleep(limits.soft);
        let hard = tokio::time::sleep(limits.hard);
        tokio::pin!(soft);
        tokio::pin!(hard);

        enum Waited {
            Exited(std::io::Result<std::process::ExitStatus>),
            SoftLimit,
            HardLimit,
        }

        let mut soft_fired = false;
        let mut timed_out = false;

        let status = loop {
            // The wait future borrows the child, so the kill happens
            // outside the select arm.
            let event = tokio::select! {
                res = child.wait() => Waited::Exited(res),
                _ = &mut soft, if !soft_fired => Waited::SoftLimit,
                _ = &mut hard, if !timed_out => Waited::HardLimit,
            };

            match event {
                Waited::Exited(res) => break res?,
                Waited::SoftLimit => {
                    soft_fired = true;
                    warn!(
                        program = %invocation.program,
                        "tool still running after soft limit of {:?}", limits.soft
                    );
                }
                Waited::HardLimit => {
                    timed_out = true;
                    warn!(
                        program = %invocation.program,
                        "tool exceeded hard limit of {:?}, killing", limits.hard
                    );
                    let _ = child.start_kill();
                }
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(ToolOutput { code: status.code(), stdout, stderr, timed_out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RunLimits {
        RunLimits::new(Duration::from_secs(5), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let inv = ToolInvocation::new("sh").arg("-c").arg("printf hello");
        let out = SystemRunner.run(&inv, limits()).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, b"hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_success() {
        let inv = ToolInvocation::new("sh").arg("-c").arg("echo oops >&2; exit 3");
        let out = SystemRunner.run(&inv, limits()).await.unwrap();
        assert!(!out.success());
        assert_eq!(out.code, Some(3));
        assert!(out.stderr_lossy().contains("oops"));
    }

    #[tokio::test]
    async fn hard_limit_kills_the_child() {
        let inv = ToolInvocation::new("sleep").arg("30");
        let lim = RunLimits::new(Duration::from_millis(20), Duration::from_millis(60));
        let out = SystemRunner.run(&inv, lim).await.unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn missing_binary_is_an_io_error() {
        let inv = ToolInvocation::new("definitely-not-a-real-binary");
        assert!(SystemRunner.run(&inv, limits()).await.is_err());
    }
}
