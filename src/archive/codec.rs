//! ZIP codec over the local filesystem

use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Write};
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;
use walkdir::WalkDir;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::{ArchiveError, Result};

/// Extension of archives produced by [`zip`]
pub const ZIP_EXTENSION: &str = "zip";

/// Unix file type bits and the symlink type
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Extract a ZIP payload into `dest_dir`
///
/// Entries are written in archive order. Existing files are overwritten.
/// Returns every path created, in entry order.
///
/// Fails with a bad-archive error when the payload is not a ZIP container,
/// when an entry resolves outside `dest_dir` (parent traversal or absolute
/// name) or when an entry is a symbolic link. Entries processed before the
/// failing one stay on disk.
pub fn unzip(bytes: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ArchiveError::Malformed(e.to_string()))?;

    let mut created = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ArchiveError::Malformed(format!("entry #{}: {}", index, e)))?;

        let name = entry.name().to_string();

        if entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            return Err(ArchiveError::Symlink(name));
        }

        let relative = contained_path(&name)?;
        let target = dest_dir.join(&relative);

        if entry.is_dir() {
            if relative.as_os_str().is_empty() {
                continue;
            }
            fs::create_dir_all(&target)?;
        } else {
            if relative.as_os_str().is_empty() {
                return Err(ArchiveError::Malformed(format!(
                    "entry '{}' has no file name",
                    name
                )));
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out).map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData => {
                    ArchiveError::Malformed(format!("entry '{}': {}", name, e))
                }
                _ => ArchiveError::Io(e),
            })?;
        }

        tracing::trace!(entry = %name, path = %target.display(), "Extracted archive entry");
        created.push(target);
    }

    Ok(created)
}

/// Pack every file and directory under `source_dir` into a new archive
///
/// The archive is named `<uuid>.zip` and placed inside `source_dir`; it never
/// contains itself. Entry names are relative to `source_dir` and use `/`
/// separators. Returns the path of the produced archive.
pub fn zip(source_dir: &Path) -> Result<PathBuf> {
    let target = source_dir.join(format!("{}.{}", Uuid::new_v4(), ZIP_EXTENSION));

    let file = File::create(&target)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();

        if path == target {
            continue;
        }

        let name = entry_name(source_dir, path)?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            writer.add_directory(name, options)?;
        } else if file_type.is_file() {
            writer.start_file(name, options)?;
            let mut input = File::open(path)?;
            io::copy(&mut input, &mut writer)?;
        }
    }

    let mut out = writer.finish()?;
    out.flush()?;

    Ok(target)
}

/// Lexically resolve an entry name to a path relative to the destination
///
/// Rejects absolute names and any `..` that would climb above the
/// destination root. `.` components are dropped.
fn contained_path(name: &str) -> Result<PathBuf> {
    if name.contains('\0') {
        return Err(ArchiveError::Malformed(format!(
            "entry '{}' contains a NUL byte",
            name.escape_default()
        )));
    }

    let mut resolved = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(ArchiveError::PathTraversal(name.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::PathTraversal(name.to_string()));
            }
        }
    }

    Ok(resolved)
}

/// Archive entry name of `path` relative to `root`, `/`-separated
fn entry_name(root: &Path, path: &Path) -> io::Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 path: {}", relative.display()),
                )
            })
        })
        .collect::<io::Result<Vec<_>>>()?;

    Ok(parts.join("/"))
}
