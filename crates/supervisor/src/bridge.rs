//! Device Bridge
//!
//! Queries the adb tool for device connectivity and boot state. Every query
//! here is advisory: failures are logged and reported as a negative result,
//! never propagated, because they are expected transient conditions while
//! the device boots.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Boot property that flips to "1" once the system has finished booting.
pub const BOOT_COMPLETED_PROP: &str = "sys.boot_completed";

/// Substring identifying emulator entries in the device list.
const EMULATOR_MARKER: &str = "emulator";

/// One row of the device table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEntry {
    pub serial: String,
    pub state: String,
}

/// Client for the device-control tool.
///
/// Always constructed around a resolved adb path; no query falls back to
/// whatever `adb` happens to be on the search path.
#[derive(Debug, Clone)]
pub struct DeviceBridge {
    adb: PathBuf,
    query_timeout: Duration,
}

impl DeviceBridge {
    /// Create a bridge around a resolved adb executable.
    pub fn new(adb: impl Into<PathBuf>, query_timeout: Duration) -> Self {
        Self {
            adb: adb.into(),
            query_timeout,
        }
    }

    /// Path of the underlying adb executable.
    pub fn adb_path(&self) -> &Path {
        &self.adb
    }

    /// Whether the device list currently reports an emulator entry.
    pub async fn is_device_connected(&self) -> bool {
        match self.query(&["devices"]).await {
            Ok(output) => contains_emulator_line(&output),
            Err(error) => {
                warn!("Error checking running emulators: {}", error);
                false
            }
        }
    }

    /// Read the boot-completed property; empty string when unreadable.
    pub async fn read_boot_property(&self) -> String {
        let command = format!("getprop {}", BOOT_COMPLETED_PROP);
        match self.query(&["shell", &command]).await {
            Ok(output) => output.trim().to_string(),
            Err(error) => {
                warn!("Error reading {}: {}", BOOT_COMPLETED_PROP, error);
                String::new()
            }
        }
    }

    /// Parse the device table for display.
    pub async fn list_devices(&self) -> Vec<DeviceEntry> {
        match self.query(&["devices"]).await {
            Ok(output) => parse_device_list(&output),
            Err(error) => {
                warn!("Error listing devices: {}", error);
                Vec::new()
            }
        }
    }

    /// Run one bounded adb query and return its stdout.
    async fn query(&self, args: &[&str]) -> Result<String, QueryError> {
        debug!("{} {:?}", self.adb.display(), args);
        let result = timeout(
            self.query_timeout,
            Command::new(&self.adb).args(args).output(),
        )
        .await;
        match result {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(Ok(output)) => Err(QueryError::Failed {
                status: output.status,
            }),
            Ok(Err(source)) => Err(QueryError::Io(source)),
            Err(_) => Err(QueryError::TimedOut {
                budget: self.query_timeout,
            }),
        }
    }
}

/// Failure of one advisory bridge query.
#[derive(Debug, thiserror::Error)]
enum QueryError {
    #[error("command failed ({status})")]
    Failed { status: std::process::ExitStatus },
    #[error("command did not complete within {budget:?}")]
    TimedOut { budget: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Line-by-line scan for the emulator marker.
fn contains_emulator_line(output: &str) -> bool {
    output.lines().any(|line| line.contains(EMULATOR_MARKER))
}

/// Parse `adb devices` output into serial/state rows, skipping the header.
fn parse_device_list(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(DeviceEntry {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICES_WITH_EMULATOR: &str =
        "List of devices attached\nemulator-5554\tdevice\n";
    const DEVICES_EMPTY: &str = "List of devices attached\n";

    #[test]
    fn emulator_marker_is_detected() {
        assert!(contains_emulator_line(DEVICES_WITH_EMULATOR));
        assert!(!contains_emulator_line(DEVICES_EMPTY));
        assert!(!contains_emulator_line(
            "List of devices attached\n0a1b2c3d\tdevice\n"
        ));
    }

    #[test]
    fn device_list_parsing() {
        let devices = parse_device_list(
            "List of devices attached\nemulator-5554\tdevice\n0a1b2c3d\toffline\n",
        );
        assert_eq!(
            devices,
            vec![
                DeviceEntry {
                    serial: "emulator-5554".to_string(),
                    state: "device".to_string(),
                },
                DeviceEntry {
                    serial: "0a1b2c3d".to_string(),
                    state: "offline".to_string(),
                },
            ]
        );
        assert!(parse_device_list(DEVICES_EMPTY).is_empty());
    }

    #[tokio::test]
    async fn query_failures_are_advisory() {
        let bridge = DeviceBridge::new("/nonexistent/adb", Duration::from_secs(1));
        assert!(!bridge.is_device_connected().await);
        assert_eq!(bridge.read_boot_property().await, "");
        assert!(bridge.list_devices().await.is_empty());
    }
}
