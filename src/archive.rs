//! Archive unpacking.
//!
//! Supported formats are picked by extension (`zip`, `gz`, `tar`, `7z`, any
//! case). Before unpacking, the leading bytes are checked with `infer` so a
//! mislabelled file is reported instead of half-extracted.

use crate::naming::{resolve_conflict, split_extension};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Number of leading bytes inspected for signatures. A tar header block is 512 bytes.
const PROBE_LEN: u64 = 512;

/// Errors that can occur while unpacking an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The extension is not one of the supported archive extensions.
    #[error("Unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    /// The file content does not carry the expected signature.
    #[error("{} does not look like a {format} archive", path.display())]
    SignatureMismatch { path: PathBuf, format: ArchiveFormat },
    /// Reading the archive or writing its content failed.
    #[error("Failed to unpack {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    /// The ZIP container is corrupt or uses an unsupported feature.
    #[error("Failed to read ZIP archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    /// The 7z container is corrupt or uses an unsupported feature.
    #[error("Failed to read 7z archive {}: {reason}", path.display())]
    SevenZip { path: PathBuf, reason: String },
}

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Zip,
    Gzip,
    Tar,
    SevenZip,
}

impl ArchiveFormat {
    /// Picks the format from a path's extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use clean_folder::archive::ArchiveFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(ArchiveFormat::from_path(Path::new("a.ZIP")), Some(ArchiveFormat::Zip));
    /// assert_eq!(ArchiveFormat::from_path(Path::new("a_tar.gz")), Some(ArchiveFormat::Gzip));
    /// assert_eq!(ArchiveFormat::from_path(Path::new("a.rar")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        let (_, extension) = split_extension(&name);
        match extension.to_lowercase().as_str() {
            ".zip" => Some(Self::Zip),
            ".gz" => Some(Self::Gzip),
            ".tar" => Some(Self::Tar),
            ".7z" => Some(Self::SevenZip),
            _ => None,
        }
    }

    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zip => "ZIP",
            Self::Gzip => "GZIP",
            Self::Tar => "TAR",
            Self::SevenZip => "7Z",
        }
    }

    /// Checks the leading bytes against the format's magic number.
    ///
    /// Plain tar is accepted unconditionally: old-style tarballs carry no
    /// magic and the tar reader validates header checksums itself.
    fn matches_signature(&self, header: &[u8]) -> bool {
        match self {
            Self::Zip => infer::archive::is_zip(header),
            Self::Gzip => infer::archive::is_gz(header),
            Self::SevenZip => infer::archive::is_7z(header),
            Self::Tar => true,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unpacks `archive_path` into `destination` and returns the detected format.
///
/// The archive itself is left in place; deleting it is the caller's decision.
pub fn extract(archive_path: &Path, destination: &Path) -> Result<ArchiveFormat, ArchiveError> {
    let format = ArchiveFormat::from_path(archive_path).ok_or_else(|| {
        ArchiveError::UnsupportedFormat {
            path: archive_path.to_path_buf(),
        }
    })?;

    let header = read_header(archive_path).map_err(io_error(archive_path))?;
    if !format.matches_signature(&header) {
        return Err(ArchiveError::SignatureMismatch {
            path: archive_path.to_path_buf(),
            format,
        });
    }

    debug!(archive = %archive_path.display(), %format, "unpacking");
    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, destination)?,
        ArchiveFormat::Gzip => extract_gzip(archive_path, destination)?,
        ArchiveFormat::Tar => {
            let file = File::open(archive_path).map_err(io_error(archive_path))?;
            tar::Archive::new(file)
                .unpack(destination)
                .map_err(io_error(archive_path))?;
        }
        ArchiveFormat::SevenZip => {
            sevenz_rust::decompress_file(archive_path, destination).map_err(|e| {
                ArchiveError::SevenZip {
                    path: archive_path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;
        }
    }

    Ok(format)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(PROBE_LEN as usize);
    File::open(path)?.take(PROBE_LEN).read_to_end(&mut header)?;
    Ok(header)
}

fn extract_zip(archive_path: &Path, destination: &Path) -> Result<(), ArchiveError> {
    let zip_error = |source| ArchiveError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    let mut archive = zip::ZipArchive::new(file).map_err(zip_error)?;
    archive.extract(destination).map_err(zip_error)
}

/// Unpacks a gzip file.
///
/// A gzip stream wrapping a tarball is unpacked as a tarball (the stage
/// before this one turns `x.tar.gz` into `x_tar.gz`, so the payload is
/// sniffed instead of trusting the name). Anything else is decompressed
/// into a single file named after the archive's stem.
fn extract_gzip(archive_path: &Path, destination: &Path) -> Result<(), ArchiveError> {
    let open = || {
        File::open(archive_path)
            .map(GzDecoder::new)
            .map_err(io_error(archive_path))
    };

    let mut payload_header = Vec::with_capacity(PROBE_LEN as usize);
    open()?
        .take(PROBE_LEN)
        .read_to_end(&mut payload_header)
        .map_err(io_error(archive_path))?;

    if infer::archive::is_tar(&payload_header) {
        return tar::Archive::new(open()?)
            .unpack(destination)
            .map_err(io_error(archive_path));
    }

    let archive_name = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, _) = split_extension(&archive_name);
    let stem = if stem.is_empty() { "unpacked" } else { stem };

    let name = resolve_conflict(destination, stem).map_err(io_error(destination))?;
    let output_path = destination.join(name);
    let mut output = File::create_new(&output_path).map_err(io_error(&output_path))?;
    io::copy(&mut open()?, &mut output).map_err(io_error(archive_path))?;
    Ok(())
}
