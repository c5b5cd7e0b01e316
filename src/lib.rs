//! Installer for the prebuilt AI Distiller (`aid`) binary.

pub mod install;

pub use install::{InstallError, InstallOptions, InstallOutcome, Installer, ensure_installed};
