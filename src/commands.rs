//! CLI commands for Droidhost
//!
//! Subcommand definitions and their execution against the supervisor and
//! provisioning crates.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use droidhost_sdk_tools::{self as sdk_tools, SdkToolPaths};
use droidhost_supervisor::{EmulatorSupervisor, StopTarget};

use crate::settings::Settings;

/// Android emulator lifecycle supervisor.
#[derive(Debug, Parser)]
#[command(name = "droidhost", version)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Settings file path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Start an emulator and wait until it is booted and connectable.
    Start(StartCommand),
    /// Stop a running emulator by pid.
    Stop(StopCommand),
    /// Install a system image and create an AVD backed by it.
    CreateAvd(CreateAvdCommand),
    /// Show connected devices.
    Status(StatusCommand),
}

impl Cli {
    /// Dispatch the parsed subcommand.
    pub async fn run(self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref()).await?;
        match self.command {
            CliCommand::Start(command) => command.execute(&settings).await,
            CliCommand::Stop(command) => command.execute(&settings).await,
            CliCommand::CreateAvd(command) => command.execute(&settings).await,
            CliCommand::Status(command) => command.execute(&settings).await,
        }
    }
}

/// Start command options
#[derive(Debug, Args)]
pub struct StartCommand {
    /// Name of the AVD to boot.
    #[arg(long)]
    pub avd: String,

    /// Android SDK root (defaults to ANDROID_SDK_ROOT / ANDROID_HOME).
    #[arg(long)]
    pub sdk_root: Option<PathBuf>,

    /// Extra arguments appended to the emulator command line.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra_args: Vec<String>,
}

impl StartCommand {
    /// Execute the start command
    pub async fn execute(&self, settings: &Settings) -> Result<()> {
        let tools = resolve_tools(self.sdk_root.as_deref(), settings)?;
        let supervisor = EmulatorSupervisor::with_config(tools, settings.supervisor_config());

        let process = supervisor.start(&self.avd, &self.extra_args).await?;
        let pid = process
            .id()
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        // The emulator keeps running after this process exits; stop it later
        // with `droidhost stop --pid <pid>`.
        info!("Emulator is ready (pid {})", pid);
        println!("{}", pid);
        Ok(())
    }
}

/// Stop command options
#[derive(Debug, Args)]
pub struct StopCommand {
    /// Pid of the emulator process.
    #[arg(long)]
    pub pid: u32,

    /// Shutdown deadline in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Android SDK root (defaults to ANDROID_SDK_ROOT / ANDROID_HOME).
    #[arg(long)]
    pub sdk_root: Option<PathBuf>,
}

impl StopCommand {
    /// Execute the stop command
    pub async fn execute(&self, settings: &Settings) -> Result<()> {
        let tools = resolve_tools(self.sdk_root.as_deref(), settings)?;
        let mut config = settings.supervisor_config();
        if let Some(secs) = self.timeout_secs {
            config.shutdown_timeout = Duration::from_secs(secs);
        }

        let supervisor = EmulatorSupervisor::with_config(tools, config);
        supervisor.stop(StopTarget::Pid(self.pid)).await?;
        Ok(())
    }
}

/// AVD creation options
#[derive(Debug, Args)]
pub struct CreateAvdCommand {
    /// Name of the AVD to create.
    #[arg(long)]
    pub name: String,

    /// System image package, e.g. "system-images;android-34;google_apis;x86_64".
    #[arg(long)]
    pub package: String,

    /// Android SDK root (defaults to ANDROID_SDK_ROOT / ANDROID_HOME).
    #[arg(long)]
    pub sdk_root: Option<PathBuf>,
}

impl CreateAvdCommand {
    /// Execute the create-avd command
    pub async fn execute(&self, settings: &Settings) -> Result<()> {
        let tools = resolve_tools(self.sdk_root.as_deref(), settings)?;
        sdk_tools::install_system_image(&tools, &self.package).await?;
        sdk_tools::create_avd(&tools, &self.name, &self.package).await?;
        println!("Created AVD: {}", self.name);
        Ok(())
    }
}

/// Status command options
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Print the device table as JSON.
    #[arg(long)]
    pub json: bool,

    /// Android SDK root (defaults to ANDROID_SDK_ROOT / ANDROID_HOME).
    #[arg(long)]
    pub sdk_root: Option<PathBuf>,
}

impl StatusCommand {
    /// Execute the status command
    pub async fn execute(&self, settings: &Settings) -> Result<()> {
        let tools = resolve_tools(self.sdk_root.as_deref(), settings)?;
        let supervisor = EmulatorSupervisor::with_config(tools, settings.supervisor_config());
        let devices = supervisor.bridge().list_devices().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&devices)?);
        } else if devices.is_empty() {
            println!("No devices connected");
        } else {
            println!("Connected devices:");
            for device in devices {
                println!("  {} - {}", device.serial, device.state);
            }
        }
        Ok(())
    }
}

/// Resolve the SDK tools from the flag, settings, or the environment.
fn resolve_tools(flag: Option<&Path>, settings: &Settings) -> Result<SdkToolPaths> {
    let root = flag
        .map(Path::to_path_buf)
        .or_else(|| settings.sdk_root.clone())
        .or_else(sdk_tools::detect_sdk_root)
        .ok_or_else(|| {
            anyhow!("no Android SDK found; pass --sdk-root or set ANDROID_SDK_ROOT")
        })?;
    Ok(SdkToolPaths::resolve(&root)?)
}
