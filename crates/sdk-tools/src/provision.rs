//! Virtual Device Provisioning
//!
//! One-shot installation of a system image and creation of the named AVD.
//! Both tools stop to ask interactive questions, so the expected answers
//! are written to their stdin up front.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use crate::paths::SdkToolPaths;

/// Provisioning errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{tool} failed ({status}): {stderr}")]
    Failed {
        tool: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Install a system image package, accepting the license prompt.
pub async fn install_system_image(
    tools: &SdkToolPaths,
    package: &str,
) -> Result<(), ProvisionError> {
    info!("Installing system image {}", package);
    run_with_input(
        &tools.sdkmanager,
        &["--install", package],
        b"y\n",
        "sdkmanager",
    )
    .await
}

/// Create (or overwrite) an AVD backed by the given system image.
///
/// Declines the custom hardware profile prompt so the device gets the
/// default definition.
pub async fn create_avd(
    tools: &SdkToolPaths,
    name: &str,
    package: &str,
) -> Result<(), ProvisionError> {
    info!("Creating AVD {} from {}", name, package);
    run_with_input(
        &tools.avdmanager,
        &["create", "avd", "--name", name, "--package", package, "--force"],
        b"no\n",
        "avdmanager",
    )
    .await
}

async fn run_with_input(
    program: &Path,
    args: &[&str],
    input: &[u8],
    tool: &'static str,
) -> Result<(), ProvisionError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(ProvisionError::Failed {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
