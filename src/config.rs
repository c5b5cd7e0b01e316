use std::path::{Path, PathBuf};
use std::time::Duration;

use aid_installer::InstallOptions;
use aid_installer::install::download::{
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_INACTIVITY_TIMEOUT, DEFAULT_MAX_REDIRECTS,
    DEFAULT_REPO, FetchOptions, ReleaseSource,
};
use aid_installer::install::detection::DEFAULT_PROBE_TIMEOUT;
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Args;

/// Installer configuration: defaults, then an optional TOML file, then CLI/env.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Release to install (defaults to this installer's own version)
    pub version: String,
    /// Directory whose `bin/` receives the binary
    pub install_root: Option<PathBuf>,
    pub base_url: String,
    pub repo: String,
    /// Expected sha256 of the release archive
    pub sha256: Option<String>,
    pub native_tools: bool,
    pub max_redirects: usize,
    pub connect_timeout_secs: u64,
    pub inactivity_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            install_root: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            repo: DEFAULT_REPO.to_string(),
            sha256: None,
            native_tools: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT.as_secs(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
        }
    }
}

impl InstallerConfig {
    /// Load from `path`, or use the defaults when no file was given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply command-line and environment overrides
    pub fn with_overrides(mut self, args: &Args) -> Self {
        if let Some(version) = &args.release {
            self.version = version.clone();
        }
        if let Some(root) = &args.install_root {
            self.install_root = Some(root.clone());
        }
        if let Some(base_url) = &args.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(repo) = &args.repo {
            self.repo = repo.clone();
        }
        if let Some(sha256) = &args.sha256 {
            self.sha256 = Some(sha256.clone());
        }
        if let Some(max_redirects) = args.max_redirects {
            self.max_redirects = max_redirects;
        }
        if args.no_native_tools {
            self.native_tools = false;
        }
        self
    }

    /// `<data_local_dir>/ai-distiller`, or the working directory as a last resort
    pub fn default_install_root() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("ai-distiller"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn into_install_options(self, args: &Args, show_progress: bool) -> InstallOptions {
        let install_root = self
            .install_root
            .unwrap_or_else(Self::default_install_root);

        let mut options = InstallOptions::new(self.version, install_root);
        options.source = ReleaseSource {
            base_url: self.base_url,
            repo: self.repo,
        };
        options.expected_sha256 = self.sha256;
        options.native_tools = self.native_tools;
        options.fetch = FetchOptions {
            max_redirects: self.max_redirects,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            inactivity_timeout: Duration::from_secs(self.inactivity_timeout_secs),
            show_progress,
        };
        options.probe_timeout = Duration::from_secs(self.probe_timeout_secs);
        options.force = args.force;
        options.dry_run = args.dry_run;
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["aid-install"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = InstallerConfig::load(None).unwrap();
        assert_eq!(cfg.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(cfg.repo, "janreges/ai-distiller");
        assert_eq!(cfg.max_redirects, 5);
        assert!(cfg.native_tools);
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.toml");
        std::fs::write(
            &path,
            "version = \"1.2.0\"\nnative_tools = false\ninstall_root = \"/opt/aid\"\n",
        )
        .unwrap();

        let cfg = InstallerConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.version, "1.2.0");
        assert!(!cfg.native_tools);
        assert_eq!(cfg.install_root, Some(PathBuf::from("/opt/aid")));
        assert_eq!(cfg.base_url, "https://github.com");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.toml");
        std::fs::write(&path, "verison = \"1.2.0\"\n").unwrap();

        let err = InstallerConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(InstallerConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let cfg = InstallerConfig {
            version: "1.0.0".to_string(),
            ..InstallerConfig::default()
        }
        .with_overrides(&args(&[
            "--release",
            "1.3.0",
            "--repo",
            "acme/aid",
            "--max-redirects",
            "2",
            "--no-native-tools",
        ]));

        assert_eq!(cfg.version, "1.3.0");
        assert_eq!(cfg.repo, "acme/aid");
        assert_eq!(cfg.max_redirects, 2);
        assert!(!cfg.native_tools);
    }

    #[test]
    fn test_into_install_options() {
        let args = args(&["--install-root", "/tmp/aid-root", "--force", "--sha256", "ABCD"]);
        let options = InstallerConfig::default()
            .with_overrides(&args)
            .into_install_options(&args, false);

        assert_eq!(options.bin_dir(), PathBuf::from("/tmp/aid-root/bin"));
        assert!(options.force);
        assert!(!options.dry_run);
        assert_eq!(options.expected_sha256.as_deref(), Some("ABCD"));
        assert_eq!(options.fetch.max_redirects, 5);
        assert_eq!(options.fetch.connect_timeout, Duration::from_secs(30));
    }
}
