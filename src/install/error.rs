//! Installer error taxonomy
//!
//! Every variant is fatal for a run. The only recoverable decisions (existing
//! binary already current, native extraction tool failing) never surface here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving, fetching, unpacking or verifying `aid`
#[derive(Debug, Error)]
pub enum InstallError {
    /// Host OS/architecture pair is outside the platform matrix
    #[error("Unsupported platform: {os}/{arch} (supported: darwin, linux, windows on amd64 or arm64)")]
    UnsupportedPlatform { os: String, arch: String },

    /// Requested version is not `MAJOR.MINOR.PATCH[-PRERELEASE]`
    #[error("Invalid version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    /// Non-200 terminal status or network failure
    #[error("Download failed for {url}{}", .status.map(|s| format!(": HTTP {s}")).unwrap_or_default())]
    Download {
        url: String,
        status: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Too many redirects (limit {limit}) while downloading {url}")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Archive checksum mismatch: expected sha256 {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Native tools and the library extractor both failed
    #[error("Failed to extract {}: {reason}. Extract the archive manually into its directory.", .archive.display())]
    Extraction { archive: PathBuf, reason: String },

    /// Extraction reported success but the binary is missing
    #[error("Extraction finished but {} was not found", .expected.display())]
    ExtractionIncomplete { expected: PathBuf },

    /// Installed binary does not run or reports the wrong version
    #[error(
        "Installed binary {} failed verification: expected version {expected}, got {}",
        .path.display(),
        .reported.as_deref().unwrap_or("no version")
    )]
    Verification {
        path: PathBuf,
        expected: String,
        reported: Option<String>,
    },

    #[error("Failed to {operation}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub(crate) fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn download(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Download {
            url: url.into(),
            status: source.status().map(|s| s.as_u16()),
            source: Some(Box::new(source)),
        }
    }
}
