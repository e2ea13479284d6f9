//! Android SDK Tools
//!
//! Locates the SDK executables the supervisor drives and provisions
//! virtual devices.

pub mod paths;
pub mod provision;

pub use paths::{detect_sdk_root, ResolveError, SdkToolPaths};
pub use provision::{create_avd, install_system_image, ProvisionError};
