//! Shared fixtures: release archives and fake `aid` binaries
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

pub const REPO: &str = "janreges/ai-distiller";

/// Shell script standing in for `aid`, printing `version` on `--version`
pub fn aid_script(version: &str) -> String {
    format!("#!/bin/sh\necho \"aid version {version}\"\n")
}

/// URL path a release archive is served from
pub fn release_path(version: &str, archive_name: &str) -> String {
    format!("/{REPO}/releases/download/v{version}/{archive_name}")
}

/// Build a `.tar.gz` in memory from `(name, contents, mode)` entries
pub fn tar_gz(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, contents, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append_data(&mut header, name, *contents).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Build a `.zip` in memory from `(name, contents, mode)` entries
pub fn zip(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for (name, contents, mode) in entries {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(*mode);
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// Release archive containing a working `aid` for `version`
pub fn release_tar_gz(version: &str) -> Vec<u8> {
    let script = aid_script(version);
    tar_gz(&[
        ("aid", script.as_bytes(), 0o755),
        ("LICENSE", &b"MIT"[..], 0o644),
    ])
}

/// Write an executable file (mode 755)
#[cfg(unix)]
pub fn write_executable(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Files directly inside `dir`, sorted
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
