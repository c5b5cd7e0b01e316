//! AI Distiller installation library
//!
//! Ensures a working `aid` binary of a requested version exists under an
//! install root, downloading and unpacking the platform release archive when
//! needed. Designed to be called once per package install.

mod binaries;
mod binary_staging;
pub mod detection;
pub mod download;
mod error;
mod orchestration;
pub mod progress;

// Public exports
pub use binaries::{BIN_DIR, BINARY_NAME, BINARY_NAME_WINDOWS};
pub use detection::{InstalledBinary, VersionProbe};
pub use error::InstallError;
pub use orchestration::{InstallOptions, InstallOutcome, InstallPlan, Installer, Remediation};

/// Ensure the requested `aid` version is installed
///
/// # Behavior
/// - Binary present and reporting the version → return immediately, no network
/// - Binary missing, outdated or broken → download, extract and verify
///
/// # Returns
/// - `Ok(outcome)` once the binary is verified (or the dry-run plan)
/// - `Err(e)` on the first failing step; the temporary archive is removed
pub async fn ensure_installed(options: InstallOptions) -> Result<InstallOutcome, InstallError> {
    Installer::new(options).run().await
}
