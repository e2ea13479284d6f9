//! Supervised Processes
//!
//! Spawning, polling, and graceful-then-forced termination of the external
//! processes the supervisor owns.

use std::io;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{PlatformConfig, StopSignal};

/// The OS refused to create a process.
#[derive(Debug, Error)]
#[error("failed to start `{program}`: {source}")]
pub struct SpawnError {
    pub program: String,
    #[source]
    pub source: io::Error,
}

/// An owned handle to one spawned external process.
///
/// The spawning orchestrator owns the handle exclusively; on a successful
/// startup it is handed to the caller, who becomes responsible for stopping
/// the process eventually.
#[derive(Debug)]
pub struct SupervisedProcess {
    child: Child,
    argv: Vec<String>,
    status: Option<ExitStatus>,
}

impl SupervisedProcess {
    /// Spawn a new process with the given argument vector.
    ///
    /// Output is not captured: the emulator is fire-and-forget and its fate
    /// is observed through the exit code alone.
    pub fn spawn(
        program: &Path,
        args: &[String],
        platform: &PlatformConfig,
    ) -> Result<Self, SpawnError> {
        let mut argv = vec![program.display().to_string()];
        argv.extend(args.iter().cloned());
        debug!("Starting process: {:?}", argv);

        let mut command = Command::new(program);
        command.args(args);
        if platform.new_process_group {
            #[cfg(windows)]
            {
                const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
                command.creation_flags(CREATE_NEW_PROCESS_GROUP);
            }
        }

        let child = command.spawn().map_err(|source| SpawnError {
            program: program.display().to_string(),
            source,
        })?;

        Ok(Self {
            child,
            argv,
            status: None,
        })
    }

    /// Last-observed exit status without blocking; `None` while running.
    pub fn poll(&mut self) -> Option<ExitStatus> {
        if self.status.is_some() {
            return self.status;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.status = Some(status);
                self.status
            }
            Ok(None) => None,
            Err(error) => {
                warn!("Failed to poll process {:?}: {}", self.argv, error);
                None
            }
        }
    }

    /// Operating-system process identity, while the process is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// The argument vector the process was started with.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Request termination, escalating from the graceful signal to a forced
    /// kill after `graceful_timeout`.
    ///
    /// No-op when the process has already exited. Never fails; a failed
    /// forced kill is logged rather than surfaced.
    pub async fn stop(&mut self, graceful_timeout: Duration, platform: &PlatformConfig) {
        if self.poll().is_some() {
            return;
        }

        debug!("Stopping process: {:?}", self.argv);
        self.send_stop_signal(platform);

        match timeout(graceful_timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.status = Some(status);
            }
            Ok(Err(error)) => {
                warn!("Failed waiting for process {:?}: {}", self.argv, error);
            }
            Err(_) => {
                warn!("Graceful stop timed out, forcibly killing process...");
                if let Err(error) = self.child.kill().await {
                    warn!("Failed to kill process {:?}: {}", self.argv, error);
                }
                self.status = self.child.try_wait().ok().flatten();
            }
        }
    }

    fn send_stop_signal(&mut self, platform: &PlatformConfig) {
        if platform.stop_signal == StopSignal::Term && self.signal_term() {
            return;
        }
        if let Err(error) = self.child.start_kill() {
            warn!("Failed to deliver stop request to {:?}: {}", self.argv, error);
        }
    }

    /// Deliver SIGTERM where signals exist; reports whether delivery was
    /// attempted so the caller can fall back to a kill request.
    #[cfg(unix)]
    fn signal_term(&self) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match self.child.id() {
            Some(pid) => {
                if let Err(errno) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    warn!("Failed to send SIGTERM to pid {}: {}", pid, errno);
                }
                true
            }
            None => false,
        }
    }

    #[cfg(not(unix))]
    fn signal_term(&self) -> bool {
        false
    }
}

/// Stop a process by raw pid, escalating from the graceful signal to a
/// forced kill after `graceful_timeout`.
///
/// A pid that no longer exists is a no-op: already-gone counts as stopped.
/// The target is not our child, so its exit is observed by polling for
/// disappearance rather than by waiting on it.
#[cfg(unix)]
pub async fn stop_by_pid(
    pid: u32,
    graceful_timeout: Duration,
    recheck_delay: Duration,
    platform: &PlatformConfig,
) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use tokio::time::sleep;

    use crate::poll::{Deadline, Poller};

    let target = Pid::from_raw(pid as i32);
    if !pid_exists(target) {
        debug!("No process exists with pid={}", pid);
        return;
    }

    debug!("Stopping process - pid={}", pid);
    if platform.stop_signal == StopSignal::Term {
        if let Err(errno) = kill(target, Signal::SIGTERM) {
            warn!("Failed to send SIGTERM to pid {}: {}", pid, errno);
        }

        let poller =
            Poller::new(Duration::from_millis(500), Deadline::after(graceful_timeout));
        loop {
            if !pid_exists(target) {
                return;
            }
            if !poller.tick().await {
                break;
            }
        }
        warn!(
            "Process {} did not terminate within {:?}. Killing.",
            pid, graceful_timeout
        );
    }

    if let Err(errno) = kill(target, Signal::SIGKILL) {
        warn!("Failed to send SIGKILL to pid {}: {}", pid, errno);
    }
    sleep(recheck_delay).await;
    if pid_exists(target) {
        warn!("Process {} still exists after forced kill", pid);
    }
}

#[cfg(not(unix))]
pub async fn stop_by_pid(
    pid: u32,
    _graceful_timeout: Duration,
    _recheck_delay: Duration,
    _platform: &PlatformConfig,
) {
    warn!("Stopping by pid is not supported on this platform (pid={})", pid);
}

#[cfg(unix)]
fn pid_exists(pid: nix::unistd::Pid) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;

    match kill(pid, None) {
        Ok(()) => true,
        // Alive but owned by someone else.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::time::sleep;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn platform() -> PlatformConfig {
        PlatformConfig::detect()
    }

    fn sh_args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn spawn_missing_executable_fails() {
        let err = SupervisedProcess::spawn(
            Path::new("/nonexistent/emulator-bin"),
            &[],
            &platform(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("emulator-bin"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn poll_reports_and_caches_exit_status() {
        let mut proc =
            SupervisedProcess::spawn(&sh(), &sh_args("exit 7"), &platform()).unwrap();
        let status = loop {
            if let Some(status) = proc.poll() {
                break status;
            }
            sleep(Duration::from_millis(10)).await;
        };
        assert_eq!(status.code(), Some(7));
        assert_eq!(proc.poll().unwrap().code(), Some(7));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_terminates_a_running_process() {
        let mut proc =
            SupervisedProcess::spawn(&sh(), &sh_args("sleep 30"), &platform()).unwrap();
        assert!(proc.poll().is_none());
        proc.stop(Duration::from_secs(5), &platform()).await;
        assert!(proc.poll().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_escalates_when_the_signal_is_ignored() {
        let mut proc = SupervisedProcess::spawn(
            &sh(),
            &sh_args("trap '' TERM; while true; do sleep 1; done"),
            &platform(),
        )
        .unwrap();
        let started = std::time::Instant::now();
        proc.stop(Duration::from_millis(300), &platform()).await;
        assert!(proc.poll().is_some());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_after_exit_is_a_no_op() {
        let mut proc =
            SupervisedProcess::spawn(&sh(), &sh_args("exit 0"), &platform()).unwrap();
        while proc.poll().is_none() {
            sleep(Duration::from_millis(10)).await;
        }
        proc.stop(Duration::from_secs(5), &platform()).await;
        assert_eq!(proc.poll().unwrap().code(), Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_by_pid_missing_process_is_a_no_op() {
        let started = std::time::Instant::now();
        stop_by_pid(
            0x3FFF_FFF0,
            Duration::from_secs(10),
            Duration::from_secs(10),
            &platform(),
        )
        .await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn stop_by_pid_terminates_a_detached_process() {
        // Double-fork so the target is not our child; its reaping is up to
        // whatever init the test environment runs, so "zombie" counts as
        // stopped below.
        let output = Command::new("/bin/sh")
            .args(["-c", "sleep 30 >/dev/null 2>&1 & echo $!"])
            .output()
            .await
            .unwrap();
        let pid: u32 = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .unwrap();

        stop_by_pid(
            pid,
            Duration::from_secs(5),
            Duration::from_millis(50),
            &platform(),
        )
        .await;

        let still_running = std::fs::read_to_string(format!("/proc/{}/stat", pid))
            .map(|stat| !stat.contains(") Z"))
            .unwrap_or(false);
        assert!(!still_running);
    }
}
