/// File relocation with normalized, collision-free names.
///
/// A file is always renamed in place to a name that is unique in both its
/// current folder and its destination before it is moved, so nothing is ever
/// silently overwritten.
use crate::archive::ArchiveError;
use crate::naming::{conflict_key, existing_names, normalize_name, pick_free_name};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during file organization operations.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The root directory path is invalid or doesn't exist.
    #[error("Invalid root path {}: {source}", path.display())]
    InvalidRootPath { path: PathBuf, source: io::Error },
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to list a directory.
    #[error("Failed to read directory {}: {source}", path.display())]
    DirectoryReadFailed { path: PathBuf, source: io::Error },
    /// Failed to remove an empty directory.
    #[error("Failed to remove directory {}: {source}", path.display())]
    DirectoryRemovalFailed { path: PathBuf, source: io::Error },
    /// Failed to rename an entry inside its own folder.
    #[error("Failed to rename {} to {}: {source}", from.display(), to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// Failed to move a file to its category directory.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// Failed to delete an archive after unpacking it.
    #[error("Failed to delete {}: {source}", path.display())]
    FileRemovalFailed { path: PathBuf, source: io::Error },
    /// The path has no parent folder or no file name component.
    #[error("Path has no usable file name: {}", path.display())]
    InvalidFileName { path: PathBuf },
    /// A directory could not be traversed.
    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),
    /// An archive could not be unpacked.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves and renames individual files.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Normalizes a file's name inside its current folder.
    ///
    /// If the normalized name is already used by a sibling, a numeric suffix
    /// is added. Returns the file's path after the rename (unchanged when
    /// the name was already normalized).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use clean_folder::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let renamed = FileOrganizer::normalize_in_place(Path::new("/tmp/junk/нотатки"))?;
    /// assert_eq!(renamed, Path::new("/tmp/junk/notatky"));
    /// # Ok::<(), clean_folder::OrganizeError>(())
    /// ```
    pub fn normalize_in_place(file_path: &Path) -> OrganizeResult<PathBuf> {
        let (folder, name) = split_path(file_path)?;
        let normalized = normalize_name(&name);
        if normalized == name {
            return Ok(file_path.to_path_buf());
        }

        let taken = existing_names(folder, file_path.file_name()).map_err(|e| {
            OrganizeError::DirectoryReadFailed {
                path: folder.to_path_buf(),
                source: e,
            }
        })?;
        let resolved = pick_free_name(&taken, &normalized);
        let new_path = folder.join(&resolved);
        rename_in_place(file_path, &new_path)?;
        Ok(new_path)
    }

    /// Normalizes a file's name and moves it into `destination`.
    ///
    /// Steps, in order:
    /// 1. normalize the name inside the current folder (see [`normalize_in_place`]);
    /// 2. if the name is taken in `destination`, rename in place once more to a
    ///    name free in both folders;
    /// 3. move the file.
    ///
    /// `destination` must already exist. Returns the file's final path.
    ///
    /// [`normalize_in_place`]: FileOrganizer::normalize_in_place
    pub fn relocate(file_path: &Path, destination: &Path) -> OrganizeResult<PathBuf> {
        let current = Self::normalize_in_place(file_path)?;
        let (folder, name) = split_path(&current)?;
        if folder == destination {
            return Ok(current);
        }

        let mut taken = existing_names(destination, None).map_err(|e| {
            OrganizeError::DirectoryReadFailed {
                path: destination.to_path_buf(),
                source: e,
            }
        })?;
        let final_name = if taken.contains(&conflict_key(&name)) {
            let siblings = existing_names(folder, current.file_name()).map_err(|e| {
                OrganizeError::DirectoryReadFailed {
                    path: folder.to_path_buf(),
                    source: e,
                }
            })?;
            taken.extend(siblings);
            pick_free_name(&taken, &name)
        } else {
            name
        };

        let staged = folder.join(&final_name);
        if staged != current {
            rename_in_place(&current, &staged)?;
        }

        let target = destination.join(&final_name);
        move_file(&staged, &target)?;
        debug!(from = %file_path.display(), to = %target.display(), "moved file");
        Ok(target)
    }
}

/// Splits a path into its parent folder and its (lossy UTF-8) file name.
fn split_path(path: &Path) -> OrganizeResult<(&Path, String)> {
    match (path.parent(), path.file_name()) {
        (Some(folder), Some(name)) => Ok((folder, name.to_string_lossy().into_owned())),
        _ => Err(OrganizeError::InvalidFileName {
            path: path.to_path_buf(),
        }),
    }
}

/// Renames an entry within its folder. The caller guarantees `to` is free.
pub(crate) fn rename_in_place(from: &Path, to: &Path) -> OrganizeResult<()> {
    fs::rename(from, to).map_err(|e| OrganizeError::RenameFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })?;
    debug!(from = %from.display(), to = %to.display(), "renamed");
    Ok(())
}

/// Moves a file, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> OrganizeResult<()> {
    let move_failed = |e| OrganizeError::FileMoveFailure {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to).map_err(move_failed)?;
            fs::remove_file(from).map_err(move_failed)
        }
        Err(e) => Err(move_failed(e)),
    }
}
