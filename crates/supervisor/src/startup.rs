//! Emulator Startup
//!
//! Launches the emulator process together with a wait-for-device companion
//! and drives readiness to the booted, connectable state. Every process
//! spawned by a failed startup is stopped before the error returns.

use droidhost_sdk_tools::SdkToolPaths;
use tracing::{debug, info};

use crate::bridge::{DeviceBridge, BOOT_COMPLETED_PROP};
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::poll::{Deadline, Poller};
use crate::process::SupervisedProcess;

/// Memory handed to the emulator, in megabytes.
const EMULATOR_MEMORY_MB: &str = "4096";

/// Timezone pinned so device-side timestamps are stable across hosts.
const EMULATOR_TIMEZONE: &str = "America/Los_Angeles";

/// Trivial remote command proving adb can execute on the device.
const CONNECTION_PROBE: &str = "ls /data/local/tmp";

/// Readiness of the supervised device. Advances strictly forward; a poll
/// can never observe an earlier state once a later one was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadinessState {
    NotConnected,
    Connected,
    BootCompleted,
}

impl ReadinessState {
    fn advance(&mut self, next: ReadinessState) {
        debug_assert!(next > *self, "readiness may only move forward");
        debug!("Readiness {:?} -> {:?}", self, next);
        *self = next;
    }
}

/// Supervises the lifecycle of a single emulator instance.
///
/// Run at most one supervisor at a time: single-instance discipline is
/// enforced by the startup precondition rather than a lock, so concurrent
/// starts from several supervisors interleave unpredictably.
pub struct EmulatorSupervisor {
    tools: SdkToolPaths,
    bridge: DeviceBridge,
    config: SupervisorConfig,
}

impl EmulatorSupervisor {
    /// Create a supervisor with default timeouts.
    pub fn new(tools: SdkToolPaths) -> Self {
        Self::with_config(tools, SupervisorConfig::default())
    }

    /// Create a supervisor with explicit timeouts.
    pub fn with_config(tools: SdkToolPaths, config: SupervisorConfig) -> Self {
        let bridge = DeviceBridge::new(&tools.adb, config.query_timeout);
        Self {
            tools,
            bridge,
            config,
        }
    }

    /// The bridge used for readiness and connectivity queries.
    pub fn bridge(&self) -> &DeviceBridge {
        &self.bridge
    }

    /// The active configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Start the emulator and wait until it is booted and connectable.
    ///
    /// On success the returned handle is owned by the caller, who becomes
    /// responsible for stopping the emulator. On any failure every process
    /// spawned by this call has been stopped before the error returns.
    pub async fn start(
        &self,
        avd_name: &str,
        extra_args: &[String],
    ) -> Result<SupervisedProcess, SupervisorError> {
        if self.bridge.is_device_connected().await {
            return Err(SupervisorError::AlreadyRunning);
        }

        let deadline = Deadline::after(self.config.startup_timeout);
        let platform = self.config.platform;
        let mut state = ReadinessState::NotConnected;

        info!("Launching emulator for AVD {}", avd_name);
        let args = emulator_args(avd_name, platform.headless, extra_args);
        let mut emulator = SupervisedProcess::spawn(&self.tools.emulator, &args, &platform)?;

        // -delay-adb alone is not reliable, so corroborate connectivity with
        // a blocking wait-for-device probe.
        let mut waiter =
            match SupervisedProcess::spawn(&self.tools.adb, &waiter_args(), &platform) {
                Ok(waiter) => waiter,
                Err(error) => {
                    self.abort(&mut emulator, None).await;
                    return Err(error.into());
                }
            };

        if let Err(error) = self
            .await_connection(&mut emulator, &mut waiter, deadline)
            .await
        {
            self.abort(&mut emulator, Some(&mut waiter)).await;
            return Err(error);
        }
        state.advance(ReadinessState::Connected);

        // The waiter exited on its own; only the emulator still carries a
        // cleanup obligation from here on.
        if let Err(error) = self.await_boot(deadline).await {
            self.abort(&mut emulator, None).await;
            return Err(error);
        }
        state.advance(ReadinessState::BootCompleted);

        if !self.bridge.is_device_connected().await {
            self.abort(&mut emulator, None).await;
            return Err(SupervisorError::StartupVerification);
        }

        info!("Emulator for AVD {} is ready", avd_name);
        Ok(emulator)
    }

    /// Poll until the wait-for-device companion reports connectivity.
    async fn await_connection(
        &self,
        emulator: &mut SupervisedProcess,
        waiter: &mut SupervisedProcess,
        deadline: Deadline,
    ) -> Result<(), SupervisorError> {
        let poller = Poller::new(self.config.startup_poll_interval, deadline);
        loop {
            if let Some(status) = emulator.poll() {
                return Err(SupervisorError::EarlyExit { status });
            }
            if let Some(status) = waiter.poll() {
                if status.success() {
                    debug!("wait-for-device process has completed");
                    return Ok(());
                }
                return Err(SupervisorError::WaiterFailed { status });
            }
            if !poller.tick().await {
                return Err(SupervisorError::StartupTimeout {
                    budget: self.config.startup_timeout,
                });
            }
        }
    }

    /// Poll the boot property until the device reports boot completion.
    async fn await_boot(&self, deadline: Deadline) -> Result<(), SupervisorError> {
        let poller = Poller::new(self.config.startup_poll_interval, deadline);
        loop {
            let value = self.bridge.read_boot_property().await;
            if value == "1" {
                return Ok(());
            }
            debug!("{}='{}', retrying shortly", BOOT_COMPLETED_PROP, value);
            if !poller.tick().await {
                return Err(SupervisorError::BootTimeout {
                    budget: self.config.startup_timeout,
                });
            }
        }
    }

    /// Stop every process spawned by a failed startup, waiter first.
    async fn abort(
        &self,
        emulator: &mut SupervisedProcess,
        waiter: Option<&mut SupervisedProcess>,
    ) {
        let graceful = self.config.graceful_stop_timeout;
        let platform = self.config.platform;
        if let Some(waiter) = waiter {
            waiter.stop(graceful, &platform).await;
        }
        emulator.stop(graceful, &platform).await;
    }
}

/// Baseline emulator argument vector, with caller extras appended last.
fn emulator_args(avd_name: &str, headless: bool, extra_args: &[String]) -> Vec<String> {
    let mut args: Vec<String> = [
        "-avd",
        avd_name,
        "-memory",
        EMULATOR_MEMORY_MB,
        "-timezone",
        EMULATOR_TIMEZONE,
        "-no-snapstorage",
        "-no-audio",
        "-no-boot-anim",
        "-gpu",
        "guest",
        "-delay-adb",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    if headless {
        args.push("-no-window".to_string());
    }
    args.extend(extra_args.iter().cloned());
    args
}

fn waiter_args() -> Vec<String> {
    ["wait-for-device", "shell", CONNECTION_PROBE]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_args_precede_extras() {
        let extra = vec!["-wipe-data".to_string()];
        let args = emulator_args("ci-avd", false, &extra);
        assert_eq!(args[0], "-avd");
        assert_eq!(args[1], "ci-avd");
        assert!(args.contains(&"-delay-adb".to_string()));
        assert!(!args.contains(&"-no-window".to_string()));
        assert_eq!(args.last(), Some(&"-wipe-data".to_string()));
    }

    #[test]
    fn headless_adds_no_window_before_extras() {
        let extra = vec!["-cores".to_string(), "4".to_string()];
        let args = emulator_args("ci-avd", true, &extra);
        let no_window = args.iter().position(|a| a == "-no-window").unwrap();
        let cores = args.iter().position(|a| a == "-cores").unwrap();
        assert!(no_window < cores);
    }

    #[test]
    fn waiter_runs_a_trivial_remote_command() {
        assert_eq!(
            waiter_args(),
            vec!["wait-for-device", "shell", "ls /data/local/tmp"]
        );
    }

    #[test]
    fn readiness_orders_forward() {
        assert!(ReadinessState::NotConnected < ReadinessState::Connected);
        assert!(ReadinessState::Connected < ReadinessState::BootCompleted);

        let mut state = ReadinessState::NotConnected;
        state.advance(ReadinessState::Connected);
        state.advance(ReadinessState::BootCompleted);
        assert_eq!(state, ReadinessState::BootCompleted);
    }
}
