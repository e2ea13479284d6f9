//! SDK Tool Resolution
//!
//! Resolves the four executables under an SDK root, failing atomically if
//! any of them is missing.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Tool resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("SDK root not found: {0}")]
    MissingRoot(PathBuf),
    #[error("SDK tool not found: {0}")]
    MissingTool(PathBuf),
}

/// Resolved locations of the SDK executables.
///
/// Constructed only through [`SdkToolPaths::resolve`]; every path existed
/// on disk at resolution time, so no partially-valid record is ever handed
/// out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkToolPaths {
    pub emulator: PathBuf,
    pub adb: PathBuf,
    pub sdkmanager: PathBuf,
    pub avdmanager: PathBuf,
}

impl SdkToolPaths {
    /// Resolve all four tools under `sdk_root`.
    pub fn resolve(sdk_root: &Path) -> Result<Self, ResolveError> {
        if !sdk_root.is_dir() {
            return Err(ResolveError::MissingRoot(sdk_root.to_path_buf()));
        }

        // sdk_root/tools/emulator is superseded by sdk_root/emulator/emulator.
        let cmdline_bin = sdk_root.join("cmdline-tools").join("latest").join("bin");
        let paths = Self {
            emulator: sdk_root.join("emulator").join(binary_name("emulator")),
            adb: sdk_root.join("platform-tools").join(binary_name("adb")),
            sdkmanager: cmdline_bin.join(script_name("sdkmanager")),
            avdmanager: cmdline_bin.join(script_name("avdmanager")),
        };

        for tool in [
            &paths.emulator,
            &paths.adb,
            &paths.sdkmanager,
            &paths.avdmanager,
        ] {
            if !tool.is_file() {
                return Err(ResolveError::MissingTool(tool.clone()));
            }
        }

        debug!("Resolved SDK tools under {:?}", sdk_root);
        Ok(paths)
    }
}

fn binary_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

fn script_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.bat", name)
    } else {
        name.to_string()
    }
}

/// Locate an SDK root from the environment or conventional directories.
pub fn detect_sdk_root() -> Option<PathBuf> {
    for var in ["ANDROID_SDK_ROOT", "ANDROID_HOME"] {
        if let Ok(value) = env::var(var) {
            let path = PathBuf::from(value);
            if path.is_dir() {
                return Some(path);
            }
        }
    }

    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        if cfg!(windows) {
            candidates.push(home.join("AppData").join("Local").join("Android").join("Sdk"));
        } else if cfg!(target_os = "macos") {
            candidates.push(home.join("Library").join("Android").join("sdk"));
        } else {
            candidates.push(home.join("Android").join("Sdk"));
        }
    }
    if cfg!(unix) {
        candidates.push(PathBuf::from("/opt/android-sdk"));
        candidates.push(PathBuf::from("/usr/local/android-sdk"));
    }

    candidates.into_iter().find(|path| path.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_layout(root: &Path, with_adb: bool) {
        let cmdline_bin = root.join("cmdline-tools").join("latest").join("bin");
        fs::create_dir_all(root.join("emulator")).unwrap();
        fs::create_dir_all(root.join("platform-tools")).unwrap();
        fs::create_dir_all(&cmdline_bin).unwrap();

        fs::write(root.join("emulator").join(binary_name("emulator")), "").unwrap();
        if with_adb {
            fs::write(root.join("platform-tools").join(binary_name("adb")), "").unwrap();
        }
        fs::write(cmdline_bin.join(script_name("sdkmanager")), "").unwrap();
        fs::write(cmdline_bin.join(script_name("avdmanager")), "").unwrap();
    }

    #[test]
    fn resolves_a_complete_layout() {
        let root = tempfile::tempdir().unwrap();
        write_layout(root.path(), true);

        let paths = SdkToolPaths::resolve(root.path()).unwrap();
        assert!(paths.emulator.is_file());
        assert!(paths.adb.is_file());
        assert!(paths.sdkmanager.is_file());
        assert!(paths.avdmanager.is_file());
    }

    #[test]
    fn missing_tool_fails_resolution() {
        let root = tempfile::tempdir().unwrap();
        write_layout(root.path(), false);

        match SdkToolPaths::resolve(root.path()) {
            Err(ResolveError::MissingTool(path)) => {
                assert!(path.ends_with(binary_name("adb")));
            }
            other => panic!("expected MissingTool, got {:?}", other),
        }
    }

    #[test]
    fn missing_root_fails_resolution() {
        let root = tempfile::tempdir().unwrap();
        let bogus = root.path().join("no-such-sdk");
        assert!(matches!(
            SdkToolPaths::resolve(&bogus),
            Err(ResolveError::MissingRoot(_))
        ));
    }
}
