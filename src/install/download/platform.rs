//! Platform detection for release archive selection

use once_cell::sync::OnceCell;

use crate::install::binaries::{BINARY_NAME, BINARY_NAME_WINDOWS};
use crate::install::error::InstallError;

/// Operating systems with published `aid` builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Darwin,
    Linux,
    Windows,
}

/// CPU architectures with published `aid` builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
}

/// Archive format a release is packaged in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Host platform in the vendor's naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformSpec {
    pub os: Os,
    pub arch: Arch,
    pub archive: ArchiveFormat,
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<PlatformSpec> = OnceCell::new();

/// Map an OS/architecture pair onto the platform matrix
///
/// Accepts Rust target names (`macos`, `x86_64`, `aarch64`) as well as the
/// vendor and Node.js spellings (`darwin`, `win32`, `x64`, `amd64`, `arm64`).
pub fn resolve(os: &str, arch: &str) -> Result<PlatformSpec, InstallError> {
    let unsupported = || InstallError::UnsupportedPlatform {
        os: os.to_string(),
        arch: arch.to_string(),
    };

    let os_kind = match os {
        "macos" | "darwin" => Os::Darwin,
        "linux" => Os::Linux,
        "windows" | "win32" => Os::Windows,
        _ => return Err(unsupported()),
    };

    let arch_kind = match arch {
        "x86_64" | "x64" | "amd64" => Arch::Amd64,
        "aarch64" | "arm64" => Arch::Arm64,
        _ => return Err(unsupported()),
    };

    let archive = match os_kind {
        Os::Windows => ArchiveFormat::Zip,
        Os::Darwin | Os::Linux => ArchiveFormat::TarGz,
    };

    Ok(PlatformSpec {
        os: os_kind,
        arch: arch_kind,
        archive,
    })
}

impl PlatformSpec {
    /// Detect current platform (cached after first call)
    pub fn detect() -> Result<Self, InstallError> {
        PLATFORM_CACHE
            .get_or_try_init(|| resolve(std::env::consts::OS, std::env::consts::ARCH))
            .copied()
    }

    pub fn os_name(&self) -> &'static str {
        match self.os {
            Os::Darwin => "darwin",
            Os::Linux => "linux",
            Os::Windows => "windows",
        }
    }

    pub fn arch_name(&self) -> &'static str {
        match self.arch {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    /// File name of the binary inside the release archive
    pub fn binary_file_name(&self) -> &'static str {
        match self.os {
            Os::Windows => BINARY_NAME_WINDOWS,
            Os::Darwin | Os::Linux => BINARY_NAME,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl std::fmt::Display for PlatformSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os_name(), self.arch_name())
    }
}
