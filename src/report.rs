//! Per-run bookkeeping.
//!
//! Every stage records what it changed and every per-item failure in a
//! [`RunReport`]. A failure never stops the run; it is reported at the end.

use crate::archive::ArchiveFormat;
use crate::file_category::Category;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CreateCategories,
    MoveFiles,
    UnpackArchives,
    DeleteEmptyFolders,
    RenameFolders,
}

impl Stage {
    /// Progress message shown while the stage runs.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::CreateCategories => "Creating category folders",
            Stage::MoveFiles => "Sorting files",
            Stage::UnpackArchives => "Unpacking archives",
            Stage::DeleteEmptyFolders => "Removing empty folders",
            Stage::RenameFolders => "Normalizing folder names",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single rename or move.
#[derive(Debug, Clone, Serialize)]
pub struct Relocation {
    /// The path before the operation.
    pub original_path: PathBuf,
    /// The path after the operation.
    pub new_path: PathBuf,
    /// The destination category, for files moved into a category folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// An archive that was unpacked and deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedArchive {
    pub path: PathBuf,
    pub format: ArchiveFormat,
}

/// An item that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub stage: Stage,
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a run changed, plus what it could not change.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The folder that was sorted.
    pub root: PathBuf,
    /// RFC 3339 timestamp of the start of the run.
    pub started_at: String,
    /// RFC 3339 timestamp of the end of the run.
    pub finished_at: Option<String>,
    /// Category folders that did not exist before the run.
    pub created_folders: Vec<PathBuf>,
    /// Files moved into category folders.
    pub moved_files: Vec<Relocation>,
    /// Files renamed without leaving their folder.
    pub renamed_files: Vec<Relocation>,
    /// Archives unpacked (and deleted).
    pub extracted_archives: Vec<ExtractedArchive>,
    /// Empty folders deleted.
    pub removed_folders: Vec<PathBuf>,
    /// Folders renamed to normalized names.
    pub renamed_folders: Vec<Relocation>,
    /// Items skipped because of an error.
    pub failures: Vec<Failure>,
}

impl RunReport {
    /// Creates an empty report for `root`, stamped with the current time.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            created_folders: Vec::new(),
            moved_files: Vec::new(),
            renamed_files: Vec::new(),
            extracted_archives: Vec::new(),
            removed_folders: Vec::new(),
            renamed_folders: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Stamps the end of the run.
    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn record_created_folder(&mut self, path: PathBuf) {
        self.created_folders.push(path);
    }

    pub fn record_move(&mut self, original_path: &Path, new_path: PathBuf, category: Category) {
        self.moved_files.push(Relocation {
            original_path: original_path.to_path_buf(),
            new_path,
            category: Some(category),
        });
    }

    /// Records an in-place file rename. No-op when the name did not change.
    pub fn record_file_rename(&mut self, original_path: &Path, new_path: PathBuf) {
        if original_path != new_path {
            self.renamed_files.push(Relocation {
                original_path: original_path.to_path_buf(),
                new_path,
                category: None,
            });
        }
    }

    pub fn record_extraction(&mut self, path: PathBuf, format: ArchiveFormat) {
        self.extracted_archives.push(ExtractedArchive { path, format });
    }

    pub fn record_removed_folder(&mut self, path: PathBuf) {
        self.removed_folders.push(path);
    }

    pub fn record_folder_rename(&mut self, original_path: PathBuf, new_path: PathBuf) {
        self.renamed_folders.push(Relocation {
            original_path,
            new_path,
            category: None,
        });
    }

    /// Records a failed item and logs it.
    pub fn record_failure(&mut self, stage: Stage, path: &Path, reason: impl fmt::Display) {
        let reason = reason.to_string();
        warn!(%stage, path = %path.display(), %reason, "item skipped");
        self.failures.push(Failure {
            stage,
            path: path.to_path_buf(),
            reason,
        });
    }

    /// Number of files moved into each category, for categories that received any.
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for category in self.moved_files.iter().filter_map(|op| op.category) {
            *counts.entry(category).or_insert(0) += 1;
        }
        counts
    }

    /// Returns true if no item failed.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of filesystem changes made.
    pub fn total_changes(&self) -> usize {
        self.created_folders.len()
            + self.moved_files.len()
            + self.renamed_files.len()
            + self.extracted_archives.len()
            + self.removed_folders.len()
            + self.renamed_folders.len()
    }
}
