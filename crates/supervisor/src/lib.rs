//! Emulator Lifecycle Supervisor
//!
//! Launches the Android emulator, waits for it to reach a booted,
//! connectable state, and tears it down again within a bounded time budget.

pub mod bridge;
pub mod config;
pub mod error;
pub mod poll;
pub mod process;
pub mod shutdown;
pub mod startup;

pub use bridge::{DeviceBridge, DeviceEntry};
pub use config::{PlatformConfig, StopSignal, SupervisorConfig};
pub use error::SupervisorError;
pub use poll::{Deadline, Poller};
pub use process::{SpawnError, SupervisedProcess};
pub use shutdown::StopTarget;
pub use startup::{EmulatorSupervisor, ReadinessState};
