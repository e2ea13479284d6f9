//! Supervisor Errors
//!
//! Fatal failures of the startup and shutdown orchestrations. Advisory
//! bridge queries never surface here; they are logged and reported as a
//! negative result at the call site.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::process::SpawnError;

/// Errors surfaced by the emulator lifecycle supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("an emulator is already running; stop it before starting a new one")]
    AlreadyRunning,
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("emulator exited early ({status})")]
    EarlyExit { status: ExitStatus },
    #[error("wait-for-device process failed ({status})")]
    WaiterFailed { status: ExitStatus },
    #[error("emulator startup timed out after {budget:?}")]
    StartupTimeout { budget: Duration },
    #[error("emulator startup timed out after {budget:?}: sys.boot_completed was not set")]
    BootTimeout { budget: Duration },
    #[error("emulator did not stop within {budget:?}")]
    ShutdownTimeout { budget: Duration },
    #[error("emulator reported boot completion but no device is connected")]
    StartupVerification,
}
