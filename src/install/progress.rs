//! Installation progress narration with download metadata

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;

/// Installation phase, narrated in order by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Resolving,   // Mapping host OS/arch to a release archive
    Checking,    // Probing an existing binary
    Downloading, // Streaming archive bytes
    Extracting,  // Unpacking the archive
    Verifying,   // Running the installed binary
    Complete,    // Binary installed and verified
}

impl InstallPhase {
    pub fn label(&self) -> &'static str {
        match self {
            InstallPhase::Resolving => "resolve",
            InstallPhase::Checking => "check",
            InstallPhase::Downloading => "download",
            InstallPhase::Extracting => "extract",
            InstallPhase::Verifying => "verify",
            InstallPhase::Complete => "complete",
        }
    }

    /// Log one step of the run
    pub fn narrate(&self, message: impl AsRef<str>) {
        info!("[{}] {}", self.label(), message.as_ref());
    }
}

/// Byte-level progress for a single archive download
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Create a bar sized from `Content-Length`, or a spinner when unknown
    pub fn new(total_bytes: Option<u64>, visible: bool) -> Self {
        let bar = match total_bytes {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("   [{bar:40.green/blue}] {bytes}/{total_bytes}  {msg}")
                {
                    bar.set_style(style.progress_chars("█▓░"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("   {spinner} {bytes}  {msg}") {
                    bar.set_style(style);
                }
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };

        if !visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }

        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

/// Render a byte count the way progress messages do (`12.3 MB`)
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1_048_576 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    }
}

/// Render elapsed time with millisecond precision (`1.234s`)
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1_048_576 + 524_288), "5.5 MB");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.500s");
    }

    #[test]
    fn test_hidden_progress_counts_bytes() {
        let progress = DownloadProgress::new(Some(100), false);
        progress.advance(40);
        progress.advance(60);
        assert_eq!(progress.bar.position(), 100);
        progress.finish();
        assert!(progress.bar.is_finished());
    }
}
