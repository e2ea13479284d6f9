//! Droidhost - Android emulator lifecycle supervisor
//!
//! Starts an Android emulator for a CI job, waits until it is booted and
//! connectable, and stops it again within a bounded time budget.
//!
//! Droidhost is organized into specialized crates:
//!
//! - `droidhost-sdk-tools`: SDK tool resolution and AVD provisioning
//! - `droidhost-supervisor`: emulator lifecycle supervision

pub mod commands;
pub mod settings;

// Re-export main components for library usage
pub use droidhost_sdk_tools as sdk_tools;
pub use droidhost_supervisor as supervisor;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
