//! Archive download with redirect following and streaming writes

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::StreamExt;
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::install::error::InstallError;
use crate::install::progress::{DownloadProgress, format_elapsed};

const USER_AGENT: &str = concat!("aid-installer/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30); // Initial connection
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300); // 5 min no data

/// Knobs for a single fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub max_redirects: usize,
    pub connect_timeout: Duration,
    pub inactivity_timeout: Duration,
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            show_progress: false,
        }
    }
}

/// What a completed fetch wrote to disk
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub bytes: u64,
    pub elapsed: Duration,
    /// Lowercase hex SHA-256 of the bytes written
    pub sha256: String,
}

/// RAII guard for a download destination
///
/// Removes the file when dropped unless the download completed and the guard
/// was disarmed.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial download {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial download {}: {}", self.path.display(), e),
        }
    }
}

/// Download `url` into `destination`, following at most `max_redirects` hops
pub async fn fetch(
    url: &str,
    destination: &Path,
    options: &FetchOptions,
) -> Result<FetchReport, InstallError> {
    let started = Instant::now();

    // Redirects are followed by hand to bound the hop count
    let client = reqwest::Client::builder()
        .connect_timeout(options.connect_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| InstallError::download(url, e))?;

    let response = follow_redirects(&client, url, options.max_redirects).await?;
    let (bytes, sha256) = stream_to_file(response, destination, options).await?;

    Ok(FetchReport {
        bytes,
        elapsed: started.elapsed(),
        sha256,
    })
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

async fn follow_redirects(
    client: &reqwest::Client,
    url: &str,
    max_redirects: usize,
) -> Result<reqwest::Response, InstallError> {
    let mut current = url.to_string();
    let mut hops = 0usize;

    loop {
        let response = client
            .get(&current)
            .send()
            .await
            .map_err(|e| InstallError::download(current.as_str(), e))?;
        let status = response.status();

        if is_followed_redirect(status) {
            if hops == max_redirects {
                return Err(InstallError::TooManyRedirects {
                    url: url.to_string(),
                    limit: max_redirects,
                });
            }

            let redirect_error = || InstallError::Download {
                url: current.clone(),
                status: Some(status.as_u16()),
                source: None,
            };
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(redirect_error)?;
            let next = response.url().join(location).map_err(|_| redirect_error())?;

            debug!("HTTP {} redirect: {} -> {}", status.as_u16(), current, next);
            current = next.to_string();
            hops += 1;
            continue;
        }

        if status != StatusCode::OK {
            return Err(InstallError::Download {
                url: current,
                status: Some(status.as_u16()),
                source: None,
            });
        }

        return Ok(response);
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    destination: &Path,
    options: &FetchOptions,
) -> Result<(u64, String), InstallError> {
    let url = response.url().to_string();
    let progress = DownloadProgress::new(response.content_length(), options.show_progress);
    if let Some(name) = destination.file_name() {
        progress.set_message(name.to_string_lossy().into_owned());
    }

    // Declared before the file so the handle closes before the guard removes it
    let guard = PartialFile::new(destination);
    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| InstallError::io(format!("create {}", destination.display()), e))?;

    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    loop {
        let chunk = match timeout(options.inactivity_timeout, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(InstallError::download(url.as_str(), e)),
            Ok(None) => break, // Stream ended normally
            Err(_) => {
                return Err(InstallError::Download {
                    url,
                    status: None,
                    source: Some(Box::new(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!(
                            "no data received for {} after {} bytes",
                            format_elapsed(options.inactivity_timeout),
                            downloaded
                        ),
                    ))),
                });
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| InstallError::io(format!("write {}", destination.display()), e))?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        progress.advance(chunk.len() as u64);
    }

    file.flush()
        .await
        .map_err(|e| InstallError::io(format!("flush {}", destination.display()), e))?;
    file.sync_all()
        .await
        .map_err(|e| InstallError::io(format!("sync {}", destination.display()), e))?;
    drop(file);

    progress.finish();
    guard.disarm();

    Ok((downloaded, hex::encode(hasher.finalize())))
}
