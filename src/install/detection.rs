//! Installed binary detection
//!
//! Determines whether an `aid` binary at a path is usable and which version
//! it reports. A binary that is missing, not executable, crashes, hangs, or
//! prints no version is "needs reinstall", never a fatal error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::timeout;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

static REPORTED_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.]+)?)").expect("version pattern is valid")
});

/// Result of running `<binary> --version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionProbe {
    pub matches: bool,
    pub reported_version: Option<String>,
}

impl VersionProbe {
    fn unusable() -> Self {
        Self {
            matches: false,
            reported_version: None,
        }
    }
}

/// On-disk state of the installed binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub path: PathBuf,
    pub reported_version: Option<String>,
    pub size_bytes: u64,
}

/// Pull the first dotted version out of `--version` output
pub fn parse_reported_version(stdout: &str) -> Option<String> {
    REPORTED_VERSION_RE
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Run the binary with `--version` and compare against `expected_version`
pub async fn probe(binary_path: &Path, expected_version: &str, limit: Duration) -> VersionProbe {
    let mut command = tokio::process::Command::new(binary_path);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = match timeout(limit, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!("Could not run {}: {}", binary_path.display(), e);
            return VersionProbe::unusable();
        }
        Err(_) => {
            debug!(
                "{} --version did not finish within {}s",
                binary_path.display(),
                limit.as_secs()
            );
            return VersionProbe::unusable();
        }
    };

    if !output.status.success() {
        debug!("{} --version exited with {}", binary_path.display(), output.status);
        return VersionProbe::unusable();
    }

    let reported_version = parse_reported_version(&String::from_utf8_lossy(&output.stdout));
    VersionProbe {
        matches: reported_version.as_deref() == Some(expected_version),
        reported_version,
    }
}

/// Inspect the binary at `binary_path`, or `None` if nothing is there
pub async fn inspect(
    binary_path: &Path,
    expected_version: &str,
    limit: Duration,
) -> Option<(InstalledBinary, VersionProbe)> {
    let metadata = tokio::fs::metadata(binary_path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    let probe = probe(binary_path, expected_version, limit).await;
    let installed = InstalledBinary {
        path: binary_path.to_path_buf(),
        reported_version: probe.reported_version.clone(),
        size_bytes: metadata.len(),
    };

    Some((installed, probe))
}
