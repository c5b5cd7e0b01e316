//! Release archive extraction
//!
//! The in-process `tar`/`flate2`/`zip` implementation always works. When
//! enabled, system archive tools found on the search path are tried first
//! because they unpack large archives much faster; any failure there falls
//! through to the next tool and finally to the library.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use flate2::read::GzDecoder;
use log::{debug, warn};
use tar::Archive;

use super::platform::ArchiveFormat;
use crate::install::error::InstallError;

/// How an archive ended up being unpacked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMethod {
    /// A system tool, by program name
    Native(&'static str),
    /// The in-process library implementation
    Library,
}

impl std::fmt::Display for ExtractMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractMethod::Native(program) => write!(f, "system {program}"),
            ExtractMethod::Library => f.write_str("built-in extractor"),
        }
    }
}

/// A system archive tool and how to invoke it
struct NativeTool {
    program: &'static str,
    args: fn(&Path, &Path) -> Vec<OsString>,
}

fn tar_args(archive: &Path, dest: &Path) -> Vec<OsString> {
    vec![
        "-xzf".into(),
        archive.as_os_str().to_owned(),
        "-C".into(),
        dest.as_os_str().to_owned(),
    ]
}

fn powershell_args(archive: &Path, dest: &Path) -> Vec<OsString> {
    let quote = |p: &Path| p.display().to_string().replace('\'', "''");
    vec![
        "-NoProfile".into(),
        "-NonInteractive".into(),
        "-Command".into(),
        format!(
            "Expand-Archive -LiteralPath '{}' -DestinationPath '{}' -Force",
            quote(archive),
            quote(dest)
        )
        .into(),
    ]
}

fn unzip_args(archive: &Path, dest: &Path) -> Vec<OsString> {
    vec![
        "-o".into(),
        "-q".into(),
        archive.as_os_str().to_owned(),
        "-d".into(),
        dest.as_os_str().to_owned(),
    ]
}

/// Candidate system tools per format, in preference order
fn native_tools(format: ArchiveFormat) -> &'static [NativeTool] {
    const TAR_GZ: &[NativeTool] = &[NativeTool {
        program: "tar",
        args: tar_args,
    }];
    const ZIP: &[NativeTool] = &[
        NativeTool {
            program: "powershell",
            args: powershell_args,
        },
        NativeTool {
            program: "unzip",
            args: unzip_args,
        },
    ];

    match format {
        ArchiveFormat::TarGz => TAR_GZ,
        ArchiveFormat::Zip => ZIP,
    }
}

/// Unpacks release archives into a directory
#[derive(Debug, Clone)]
pub struct Extractor {
    native_tools: bool,
    search_path: Option<OsString>,
}

impl Extractor {
    pub fn new(native_tools: bool) -> Self {
        Self {
            native_tools,
            search_path: None,
        }
    }

    /// Look up native tools on `path` instead of `PATH`
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_default();
                which::which_in(program, Some(paths), cwd).ok()
            }
            None => which::which(program).ok(),
        }
    }

    /// Extract `archive` into `destination`, creating it if needed
    pub async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        format: ArchiveFormat,
    ) -> Result<ExtractMethod, InstallError> {
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| InstallError::io(format!("create {}", destination.display()), e))?;

        if self.native_tools {
            for tool in native_tools(format) {
                let Some(program_path) = self.locate(tool.program) else {
                    debug!("{} not found on search path, skipping", tool.program);
                    continue;
                };

                match run_native(&program_path, (tool.args)(archive, destination)).await {
                    Ok(()) => return Ok(ExtractMethod::Native(tool.program)),
                    Err(reason) => {
                        warn!(
                            "{} failed to extract {}: {}; trying next method",
                            tool.program,
                            archive.display(),
                            reason
                        );
                    }
                }
            }
        }

        extract_with_library(archive, destination, format).await?;
        Ok(ExtractMethod::Library)
    }
}

async fn run_native(program: &Path, args: Vec<OsString>) -> Result<(), String> {
    let output = tokio::process::Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{} ({})",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

async fn extract_with_library(
    archive: &Path,
    destination: &Path,
    format: ArchiveFormat,
) -> Result<(), InstallError> {
    let archive_path = archive.to_path_buf();
    let dest = destination.to_path_buf();

    // CPU-bound decompression runs off the async workers
    let result = tokio::task::spawn_blocking(move || match format {
        ArchiveFormat::TarGz => unpack_tar_gz(&archive_path, &dest),
        ArchiveFormat::Zip => unpack_zip(&archive_path, &dest),
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|inner| inner.map_err(|e| e.to_string()));

    result.map_err(|reason| InstallError::Extraction {
        archive: archive.to_path_buf(),
        reason,
    })
}

fn unpack_tar_gz(archive_path: &Path, dest: &Path) -> io::Result<()> {
    let tar_gz = fs::File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(tar_gz));
    archive.set_preserve_permissions(true);

    for entry in archive.entries()? {
        let mut entry = entry?;
        debug!("Extracting {}", entry.path()?.display());
        // unpack_in refuses entries that would escape `dest`
        entry.unpack_in(dest)?;
    }

    Ok(())
}

fn unpack_zip(archive_path: &Path, dest: &Path) -> io::Result<()> {
    use zip::ZipArchive;

    let zip_file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(zip_file).map_err(io::Error::other)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(io::Error::other)?;

        let Some(relative) = file.enclosed_name() else {
            warn!("Skipping unsafe zip entry {}", file.name());
            continue;
        };
        let out_path = dest.join(relative);
        debug!("Extracting {}", file.name());

        if file.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = fs::File::create(&out_path)?;
        io::copy(&mut file, &mut out_file)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    debug!("Unpacked {} zip entries", archive.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_tar_gz(path: &Path) {
        let file = fs::File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (name, body, mode) in [
            ("aid", &b"#!/bin/sh\necho aid 1.3.0\n"[..], 0o755),
            ("docs/README.md", &b"readme"[..], 0o644),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(mode);
            header.set_cksum();
            builder.append_data(&mut header, name, body).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
    }

    fn write_zip(path: &Path) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        writer.start_file("aid.exe", options).unwrap();
        writer.write_all(b"binary").unwrap();
        writer.add_directory("docs/", options).unwrap();
        writer.start_file("docs/README.md", options).unwrap();
        writer.write_all(b"readme").unwrap();
        writer.finish().unwrap();
    }

    fn assert_tar_tree(dest: &Path) {
        assert_eq!(
            fs::read_to_string(dest.join("aid")).unwrap(),
            "#!/bin/sh\necho aid 1.3.0\n"
        );
        assert_eq!(fs::read_to_string(dest.join("docs/README.md")).unwrap(), "readme");
    }

    #[tokio::test]
    async fn test_library_extracts_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("aid.tar.gz");
        write_tar_gz(&archive);
        let dest = dir.path().join("bin");

        let method = Extractor::new(false)
            .extract(&archive, &dest, ArchiveFormat::TarGz)
            .await
            .unwrap();

        assert_eq!(method, ExtractMethod::Library);
        assert_tar_tree(&dest);
    }

    #[tokio::test]
    async fn test_missing_native_tool_falls_back_to_library() {
        let dir = tempfile::tempdir().unwrap();
        let empty_path = tempfile::tempdir().unwrap();
        let archive = dir.path().join("aid.tar.gz");
        write_tar_gz(&archive);
        let dest = dir.path().join("nested/bin");

        let method = Extractor::new(true)
            .with_search_path(empty_path.path().as_os_str())
            .extract(&archive, &dest, ArchiveFormat::TarGz)
            .await
            .unwrap();

        assert_eq!(method, ExtractMethod::Library);
        assert_tar_tree(&dest);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_failing_native_tool_falls_back_to_library() {
        use std::os::unix::fs::PermissionsExt;

        let tools = tempfile::tempdir().unwrap();
        let fake_tar = tools.path().join("tar");
        fs::write(&fake_tar, "#!/bin/sh\necho broken >&2\nexit 2\n").unwrap();
        fs::set_permissions(&fake_tar, fs::Permissions::from_mode(0o755)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("aid.tar.gz");
        write_tar_gz(&archive);
        let dest = dir.path().join("bin");

        let method = Extractor::new(true)
            .with_search_path(tools.path().as_os_str())
            .extract(&archive, &dest, ArchiveFormat::TarGz)
            .await
            .unwrap();

        assert_eq!(method, ExtractMethod::Library);
        assert_tar_tree(&dest);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_system_tar_is_preferred_when_present() {
        if which::which("tar").is_err() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("aid.tar.gz");
        write_tar_gz(&archive);
        let dest = dir.path().join("bin");

        let method = Extractor::new(true)
            .extract(&archive, &dest, ArchiveFormat::TarGz)
            .await
            .unwrap();

        assert_eq!(method, ExtractMethod::Native("tar"));
        assert_tar_tree(&dest);
    }

    #[tokio::test]
    async fn test_library_extracts_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("aid.zip");
        write_zip(&archive);
        let dest = dir.path().join("bin");

        let method = Extractor::new(false)
            .extract(&archive, &dest, ArchiveFormat::Zip)
            .await
            .unwrap();

        assert_eq!(method, ExtractMethod::Library);
        assert_eq!(fs::read(dest.join("aid.exe")).unwrap(), b"binary");
        assert_eq!(fs::read_to_string(dest.join("docs/README.md")).unwrap(), "readme");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("aid.exe")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("aid.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let err = Extractor::new(false)
            .extract(&archive, &dir.path().join("bin"), ArchiveFormat::TarGz)
            .await
            .unwrap_err();

        match err {
            InstallError::Extraction { archive: failed, .. } => assert_eq!(failed, archive),
            other => panic!("expected extraction error, got {other:?}"),
        }
    }

    #[test]
    fn test_powershell_args_escape_quotes() {
        let args = powershell_args(Path::new("C:\\it's\\a.zip"), Path::new("C:\\bin"));
        let command = args.last().unwrap().to_string_lossy().into_owned();
        assert!(command.contains("'C:\\it''s\\a.zip'"));
        assert!(command.ends_with("-Force"));
    }
}
