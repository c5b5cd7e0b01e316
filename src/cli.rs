use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for aid-install
///
/// Normally run with no arguments from a package manager lifecycle hook.
#[derive(Parser, Debug, Clone)]
#[command(name = "aid-install")]
#[command(version, about = "Download and install the AI Distiller (aid) binary")]
pub struct Args {
    /// Release version to install (defaults to the installer's version)
    #[arg(long, env = "AID_VERSION", value_name = "VERSION")]
    pub release: Option<String>,

    /// Install root; the binary is placed in <ROOT>/bin
    #[arg(long, env = "AID_INSTALL_ROOT", value_name = "ROOT")]
    pub install_root: Option<PathBuf>,

    /// Base URL releases are downloaded from (mirrors, testing)
    #[arg(long, env = "AID_DOWNLOAD_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Repository slug, <org>/<repo>
    #[arg(long, env = "AID_REPO")]
    pub repo: Option<String>,

    /// Expected sha256 of the release archive
    #[arg(long, env = "AID_SHA256", value_name = "HEX")]
    pub sha256: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long, short = 'c', env = "AID_INSTALLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of HTTP redirects to follow
    #[arg(long, value_name = "N")]
    pub max_redirects: Option<usize>,

    /// Only use the built-in extractor, never system tar/unzip/PowerShell
    #[arg(long)]
    pub no_native_tools: bool,

    /// Reinstall even if the requested version is already present
    #[arg(long)]
    pub force: bool,

    /// Show what would be done without doing it
    #[arg(long)]
    pub dry_run: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q')]
    pub quiet: bool,
}
