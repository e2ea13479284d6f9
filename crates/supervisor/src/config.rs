//! Supervisor Configuration
//!
//! Timeouts, polling cadence, and platform behavior. Platform specifics are
//! resolved once at construction and passed explicitly into process
//! operations rather than read from globals.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a graceful stop is requested before escalating to a forced kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopSignal {
    /// SIGTERM, where signals are available.
    Term,
    /// No graceful delivery available; request a kill outright.
    Kill,
}

/// Platform behavior for spawning and stopping supervised processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Launch the emulator without a window (required on headless Linux CI,
    /// which otherwise fails to initialize a display backend).
    pub headless: bool,
    /// Signal used to request graceful termination.
    pub stop_signal: StopSignal,
    /// Spawn supervised processes into their own process group.
    pub new_process_group: bool,
}

impl PlatformConfig {
    /// Settings for the current operating environment.
    pub fn detect() -> Self {
        Self {
            headless: cfg!(target_os = "linux"),
            stop_signal: if cfg!(unix) {
                StopSignal::Term
            } else {
                StopSignal::Kill
            },
            new_process_group: cfg!(windows),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::detect()
    }
}

/// Timeouts and polling cadence for the lifecycle supervisor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Total budget for the emulator to become reachable and finish booting.
    pub startup_timeout: Duration,
    /// Sleep between startup readiness polls.
    pub startup_poll_interval: Duration,
    /// Total budget for the device to disappear after a stop request.
    pub shutdown_timeout: Duration,
    /// Sleep between shutdown disconnect polls.
    pub shutdown_poll_interval: Duration,
    /// Wait after the graceful signal before force-killing an owned process.
    pub graceful_stop_timeout: Duration,
    /// Wait after the graceful signal before force-killing by bare pid.
    pub pid_stop_timeout: Duration,
    /// Delay before the final existence re-check after a pid-based kill.
    pub pid_recheck_delay: Duration,
    /// Per-call budget for diagnostic bridge queries.
    pub query_timeout: Duration,
    /// Platform-specific spawn and stop behavior.
    pub platform: PlatformConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            // Some CIs are slow to boot an emulator; give them 20 minutes.
            startup_timeout: Duration::from_secs(20 * 60),
            startup_poll_interval: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(120),
            shutdown_poll_interval: Duration::from_secs(5),
            graceful_stop_timeout: Duration::from_secs(30),
            pid_stop_timeout: Duration::from_secs(60),
            pid_recheck_delay: Duration::from_secs(10),
            query_timeout: Duration::from_secs(10),
            platform: PlatformConfig::detect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let config = SupervisorConfig::default();
        assert_eq!(config.startup_timeout, Duration::from_secs(1200));
        assert_eq!(config.startup_poll_interval, Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(120));
        assert_eq!(config.shutdown_poll_interval, Duration::from_secs(5));
        assert_eq!(config.graceful_stop_timeout, Duration::from_secs(30));
        assert_eq!(config.pid_stop_timeout, Duration::from_secs(60));
    }

    #[test]
    fn platform_matches_target() {
        let platform = PlatformConfig::detect();
        #[cfg(target_os = "linux")]
        assert!(platform.headless);
        #[cfg(unix)]
        assert_eq!(platform.stop_signal, StopSignal::Term);
        #[cfg(windows)]
        assert!(platform.new_process_group);
    }
}
