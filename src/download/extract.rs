//! Archive extraction
//!
//! Unpacks gzipped tarballs (npm, Hackage, PyPI sdists) and zip archives
//! (NuGet packages) with every entry path checked against directory
//! traversal.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
#[cfg(test)]
use mockall::automock;
use tar::Archive;
use tracing::debug;

use crate::error::ExtractError;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Unpacks a downloaded artifact into a directory
#[cfg_attr(test, automock)]
pub trait Extractor: Send + Sync {
    /// Extract `bytes` into `target` and return the extracted location
    fn extract(&self, bytes: &[u8], target: &Path) -> Result<PathBuf, ExtractError>;
}

/// Extractor for `.tar.gz` and `.zip` archives, detected by magic bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn extract(&self, bytes: &[u8], target: &Path) -> Result<PathBuf, ExtractError> {
        let result = if bytes.starts_with(GZIP_MAGIC) {
            extract_tarball(GzDecoder::new(bytes), target)
        } else if bytes.starts_with(ZIP_MAGIC) {
            extract_zip(bytes, target)
        } else {
            return Err(ExtractError::UnsupportedFormat);
        };

        if result.is_err() && target.exists() {
            // Leave nothing that could later pass for a finished extraction
            let _ = fs::remove_dir_all(target);
        }
        result.map(|()| target.to_path_buf())
    }
}

fn extract_tarball<R: Read>(reader: R, target: &Path) -> Result<(), ExtractError> {
    let mut archive = Archive::new(reader);
    fs::create_dir_all(target)?;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let safe_path = validate_extract_path(&entry_path, target)?;

        match entry.header().entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                write_file(&mut entry, &safe_path)?;
            }
            tar::EntryType::Directory => fs::create_dir_all(&safe_path)?,
            other => debug!("Skipping {:?} entry {}", other, entry_path.display()),
        }
    }

    Ok(())
}

fn extract_zip(bytes: &[u8], target: &Path) -> Result<(), ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    fs::create_dir_all(target)?;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let entry_path = PathBuf::from(file.name());
        let safe_path = validate_extract_path(&entry_path, target)?;

        if file.is_dir() {
            fs::create_dir_all(&safe_path)?;
        } else {
            write_file(&mut file, &safe_path)?;
        }
    }

    Ok(())
}

fn write_file<R: Read>(reader: &mut R, path: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    std::io::copy(reader, &mut file)?;
    Ok(())
}

/// Resolve `entry_path` below `target`, rejecting absolute paths and `..`
fn validate_extract_path(entry_path: &Path, target: &Path) -> Result<PathBuf, ExtractError> {
    let mut safe_path = target.to_path_buf();

    for component in entry_path.components() {
        match component {
            Component::Normal(name) => safe_path.push(name),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::UnsafePath(entry_path.display().to_string()));
            }
        }
    }

    if !safe_path.starts_with(target) {
        return Err(ExtractError::UnsafePath(entry_path.display().to_string()));
    }

    Ok(safe_path)
}
