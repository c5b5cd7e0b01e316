//! Installation orchestration
//!
//! Sequences resolve → check → fetch → extract → verify → cleanup. Each step
//! either succeeds or aborts the run; the temporary archive is removed on
//! every path once the download has started.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::binaries::BIN_DIR;
use super::binary_staging::{make_executable, remove_stale_binary};
use super::detection::{self, DEFAULT_PROBE_TIMEOUT, InstalledBinary};
use super::download::{Extractor, FetchOptions, PlatformSpec, ReleaseSource, ReleaseTarget, fetch};
use super::error::InstallError;
use super::progress::{InstallPhase, format_bytes, format_elapsed};

/// Everything a single install run needs to know
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Version to install, with or without a leading `v`
    pub version: String,
    /// Root directory; the binary lands in `<root>/bin`
    pub install_root: PathBuf,
    pub source: ReleaseSource,
    /// Expected lowercase hex SHA-256 of the release archive
    pub expected_sha256: Option<String>,
    /// Reinstall even when the current binary already matches
    pub force: bool,
    /// Try system archive tools before the built-in extractor
    pub native_tools: bool,
    pub fetch: FetchOptions,
    pub probe_timeout: Duration,
    /// Resolve and report the plan without touching network or disk
    pub dry_run: bool,
    /// Override host detection
    pub platform: Option<PlatformSpec>,
}

impl InstallOptions {
    pub fn new(version: impl Into<String>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            version: version.into(),
            install_root: install_root.into(),
            source: ReleaseSource::default(),
            expected_sha256: None,
            force: false,
            native_tools: true,
            fetch: FetchOptions::default(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            dry_run: false,
            platform: None,
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.install_root.join(BIN_DIR)
    }
}

/// Resolved paths and URL for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub platform: PlatformSpec,
    pub target: ReleaseTarget,
    pub bin_dir: PathBuf,
    pub binary_path: PathBuf,
    pub archive_path: PathBuf,
}

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The requested version was already present; nothing was downloaded
    AlreadyInstalled(InstalledBinary),
    /// A fresh binary was downloaded, extracted and verified
    Installed(InstalledBinary),
    /// Dry run: the plan that would have executed
    Planned(InstallPlan),
}

/// Manual-install guidance printed when a run fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    pub download_url: String,
    pub target_dir: PathBuf,
}

impl std::fmt::Display for Remediation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "To install manually:")?;
        writeln!(f, "  1. Download the archive for your platform from {}", self.download_url)?;
        writeln!(f, "  2. Extract it into {}", self.target_dir.display())?;
        write!(f, "  3. Make sure the binary is executable")
    }
}

/// RAII guard for the downloaded archive
///
/// Deletes the archive when dropped, whether the run succeeded or failed.
/// A failed deletion is logged and never replaces the run's own error.
struct TempArchive {
    path: PathBuf,
}

impl TempArchive {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary archive {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove temporary archive {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Drives one install run
pub struct Installer {
    options: InstallOptions,
    extractor: Extractor,
}

impl Installer {
    pub fn new(options: InstallOptions) -> Self {
        let extractor = Extractor::new(options.native_tools);
        Self { options, extractor }
    }

    /// Replace the extractor (e.g. to restrict the tool search path)
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    fn platform(&self) -> Result<PlatformSpec, InstallError> {
        match self.options.platform {
            Some(platform) => Ok(platform),
            None => PlatformSpec::detect(),
        }
    }

    /// Resolve the platform, release URL and on-disk paths
    pub fn plan(&self) -> Result<InstallPlan, InstallError> {
        let platform = self.platform()?;
        let target = ReleaseTarget::new(platform, &self.options.version, &self.options.source)?;
        let bin_dir = self.options.bin_dir();
        let binary_path = bin_dir.join(platform.binary_file_name());
        let archive_path = bin_dir.join(&target.archive_name);

        Ok(InstallPlan {
            platform,
            target,
            bin_dir,
            binary_path,
            archive_path,
        })
    }

    /// Best available manual-download guidance for the configured run
    pub fn remediation(&self) -> Remediation {
        let download_url = match self.plan() {
            Ok(plan) => plan.target.manual_download_page().to_string(),
            Err(_) => format!(
                "{}/{}/releases",
                self.options.source.base_url.trim_end_matches('/'),
                self.options.source.repo.trim_matches('/')
            ),
        };

        Remediation {
            download_url,
            target_dir: self.options.bin_dir(),
        }
    }

    /// Ensure the requested version is installed
    pub async fn run(&self) -> Result<InstallOutcome, InstallError> {
        let plan = self.plan()?;
        InstallPhase::Resolving.narrate(format!(
            "AI Distiller v{} for {}",
            plan.target.version, plan.platform
        ));
        InstallPhase::Resolving.narrate(format!("URL: {}", plan.target.download_url));

        if self.options.dry_run {
            InstallPhase::Complete.narrate(format!(
                "Dry run: would install to {}",
                plan.binary_path.display()
            ));
            return Ok(InstallOutcome::Planned(plan));
        }

        if let Some(installed) = self.check_existing(&plan).await {
            return Ok(InstallOutcome::AlreadyInstalled(installed));
        }

        tokio::fs::create_dir_all(&plan.bin_dir)
            .await
            .map_err(|e| InstallError::io(format!("create {}", plan.bin_dir.display()), e))?;

        // Dropped at the end of this scope on every path, success or error
        let archive = TempArchive::new(plan.archive_path.clone());
        self.download(&plan, archive.path()).await?;
        self.extract(&plan, archive.path()).await?;
        let installed = self.verify(&plan).await?;

        InstallPhase::Complete.narrate(format!(
            "AI Distiller v{} installed at {} ({})",
            plan.target.version,
            installed.path.display(),
            format_bytes(installed.size_bytes)
        ));
        Ok(InstallOutcome::Installed(installed))
    }

    /// Short-circuit when the current binary already reports the version
    async fn check_existing(&self, plan: &InstallPlan) -> Option<InstalledBinary> {
        let (installed, probe) = detection::inspect(
            &plan.binary_path,
            &plan.target.version,
            self.options.probe_timeout,
        )
        .await?;

        if probe.matches && !self.options.force {
            InstallPhase::Checking.narrate(format!(
                "{} already reports v{}, skipping download",
                plan.binary_path.display(),
                plan.target.version
            ));
            return Some(installed);
        }

        match (&probe.reported_version, self.options.force) {
            (Some(current), true) if probe.matches => InstallPhase::Checking
                .narrate(format!("Reinstalling v{current} (forced)")),
            (Some(current), _) => InstallPhase::Checking.narrate(format!(
                "Found v{current}, replacing with v{}",
                plan.target.version
            )),
            (None, _) => InstallPhase::Checking.narrate(format!(
                "Existing {} is unusable, reinstalling",
                plan.binary_path.display()
            )),
        }
        remove_stale_binary(&plan.binary_path);
        None
    }

    async fn download(&self, plan: &InstallPlan, archive_path: &Path) -> Result<(), InstallError> {
        InstallPhase::Downloading.narrate(format!("Downloading {}...", plan.target.archive_name));

        let report = fetch(&plan.target.download_url, archive_path, &self.options.fetch).await?;
        InstallPhase::Downloading.narrate(format!(
            "Download complete in {} ({})",
            format_elapsed(report.elapsed),
            format_bytes(report.bytes)
        ));

        if let Some(expected) = &self.options.expected_sha256 {
            let expected = expected.trim().to_ascii_lowercase();
            if expected != report.sha256 {
                return Err(InstallError::ChecksumMismatch {
                    expected,
                    actual: report.sha256,
                });
            }
            info!("Archive sha256 verified: {}", report.sha256);
        }

        Ok(())
    }

    async fn extract(&self, plan: &InstallPlan, archive_path: &Path) -> Result<(), InstallError> {
        InstallPhase::Extracting.narrate(format!("Extracting into {}...", plan.bin_dir.display()));

        let started = Instant::now();
        let method = self
            .extractor
            .extract(archive_path, &plan.bin_dir, plan.platform.archive)
            .await?;
        InstallPhase::Extracting.narrate(format!(
            "Extracted with {} in {}",
            method,
            format_elapsed(started.elapsed())
        ));

        if !plan.binary_path.is_file() {
            return Err(InstallError::ExtractionIncomplete {
                expected: plan.binary_path.clone(),
            });
        }

        if !plan.platform.is_windows() {
            make_executable(&plan.binary_path)?;
        }

        Ok(())
    }

    async fn verify(&self, plan: &InstallPlan) -> Result<InstalledBinary, InstallError> {
        InstallPhase::Verifying.narrate(format!("Running {} --version", plan.binary_path.display()));

        let probe = detection::probe(
            &plan.binary_path,
            &plan.target.version,
            self.options.probe_timeout,
        )
        .await;

        if !probe.matches {
            return Err(InstallError::Verification {
                path: plan.binary_path.clone(),
                expected: plan.target.version.clone(),
                reported: probe.reported_version,
            });
        }

        let size_bytes = tokio::fs::metadata(&plan.binary_path)
            .await
            .map_err(|e| InstallError::io(format!("read metadata for {}", plan.binary_path.display()), e))?
            .len();

        Ok(InstalledBinary {
            path: plan.binary_path.clone(),
            reported_version: probe.reported_version,
            size_bytes,
        })
    }
}
