//! Emulator Shutdown
//!
//! Stops a running emulator, given either the owned process handle or a
//! bare pid, and waits for the device to disappear from the device list.

use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::poll::{Deadline, Poller};
use crate::process::{self, SupervisedProcess};
use crate::startup::EmulatorSupervisor;

/// What to stop: an owned process handle or a bare process identity.
#[derive(Debug)]
pub enum StopTarget {
    Process(SupervisedProcess),
    Pid(u32),
}

impl From<SupervisedProcess> for StopTarget {
    fn from(process: SupervisedProcess) -> Self {
        Self::Process(process)
    }
}

impl From<u32> for StopTarget {
    fn from(pid: u32) -> Self {
        Self::Pid(pid)
    }
}

impl EmulatorSupervisor {
    /// Stop a running emulator and wait for the device to disappear.
    ///
    /// Already-stopped is success: when no emulator device is connected the
    /// call returns immediately. The stop request itself is best-effort;
    /// only deadline exhaustion while the device stays connected is an
    /// error.
    pub async fn stop(
        &self,
        target: impl Into<StopTarget>,
    ) -> Result<(), SupervisorError> {
        if !self.bridge().is_device_connected().await {
            warn!("No emulator instances are currently running");
            return Ok(());
        }

        let config = *self.config();
        let deadline = Deadline::after(config.shutdown_timeout);

        match target.into() {
            StopTarget::Process(mut process) => {
                info!("Stopping emulator process");
                process
                    .stop(config.graceful_stop_timeout, &config.platform)
                    .await;
            }
            StopTarget::Pid(pid) => {
                info!("Stopping emulator with pid {}", pid);
                process::stop_by_pid(
                    pid,
                    config.pid_stop_timeout,
                    config.pid_recheck_delay,
                    &config.platform,
                )
                .await;
            }
        }

        let poller = Poller::new(config.shutdown_poll_interval, deadline);
        loop {
            if !self.bridge().is_device_connected().await {
                break;
            }
            debug!("Emulator still running. Checking again shortly...");
            if !poller.tick().await {
                return Err(SupervisorError::ShutdownTimeout {
                    budget: config.shutdown_timeout,
                });
            }
        }

        info!("Emulator stopped successfully");
        Ok(())
    }
}
