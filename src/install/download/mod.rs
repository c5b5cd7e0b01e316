//! GitHub release download and archive extraction
//!
//! ## Module Organization
//!
//! - `platform` - Host detection and archive format selection
//! - `github` - Release archive naming and download URLs
//! - `core` - Streaming download with bounded redirect following
//! - `extract` - Native-tool and built-in archive extraction

mod core;
mod extract;
mod github;
mod platform;

// Re-export public API
pub use self::core::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_INACTIVITY_TIMEOUT, DEFAULT_MAX_REDIRECTS, FetchOptions,
    FetchReport, fetch,
};
pub use extract::{ExtractMethod, Extractor};
pub use github::{DEFAULT_BASE_URL, DEFAULT_REPO, ReleaseSource, ReleaseTarget, normalize_version};
pub use platform::{Arch, ArchiveFormat, Os, PlatformSpec, resolve};
