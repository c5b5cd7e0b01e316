//! Canonical names of the installed artifact
//!
//! The install root holds a single `bin/` directory containing the `aid`
//! binary and, transiently, the release archive it came from.

/// Binary name without platform suffix
pub const BINARY_NAME: &str = "aid";

/// Binary name on Windows
pub const BINARY_NAME_WINDOWS: &str = "aid.exe";

/// Directory under the install root that receives the binary
pub const BIN_DIR: &str = "bin";
