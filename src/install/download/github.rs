//! GitHub release naming: archive names and download URLs

use once_cell::sync::Lazy;
use regex::Regex;

use super::platform::PlatformSpec;
use crate::install::error::InstallError;

pub const DEFAULT_BASE_URL: &str = "https://github.com";
pub const DEFAULT_REPO: &str = "janreges/ai-distiller";

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z.]+)?$").expect("version pattern is valid")
});

/// Where release archives are published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    /// Scheme and host, e.g. `https://github.com` or a mirror
    pub base_url: String,
    /// `<org>/<repo>` slug
    pub repo: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            repo: DEFAULT_REPO.to_string(),
        }
    }
}

/// A versioned archive for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    pub version: String,
    pub archive_name: String,
    pub download_url: String,
    release_page: String,
}

impl ReleaseTarget {
    pub fn new(
        platform: PlatformSpec,
        version: &str,
        source: &ReleaseSource,
    ) -> Result<Self, InstallError> {
        let version = normalize_version(version)?;
        let archive_name = format!(
            "aid-{}-{}-v{}.{}",
            platform.os_name(),
            platform.arch_name(),
            version,
            platform.archive.extension()
        );

        let base = source.base_url.trim_end_matches('/');
        let repo = source.repo.trim_matches('/');
        let download_url = format!("{base}/{repo}/releases/download/v{version}/{archive_name}");
        let release_page = format!("{base}/{repo}/releases/tag/v{version}");

        Ok(Self {
            version,
            archive_name,
            download_url,
            release_page,
        })
    }

    /// Human-facing release page for manual downloads
    pub fn manual_download_page(&self) -> &str {
        &self.release_page
    }
}

/// Strip a leading `v` and check the version shape
pub fn normalize_version(version: &str) -> Result<String, InstallError> {
    let trimmed = version.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if VERSION_RE.is_match(bare) {
        Ok(bare.to_string())
    } else {
        Err(InstallError::InvalidVersion(version.to_string()))
    }
}
