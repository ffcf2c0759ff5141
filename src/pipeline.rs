//! The five-stage sorting pipeline.
//!
//! Stages run strictly in order and each one re-reads the tree, so later
//! stages see every change made by earlier ones:
//!
//! 1. create the category folders under the root;
//! 2. walk the tree, moving recognized files into category folders and
//!    normalizing the names of the rest in place;
//! 3. unpack archives found directly in `archives/`;
//! 4. delete empty folders, deepest first;
//! 5. normalize folder names.
//!
//! Directory listings are sorted by name (files before folders), which makes
//! conflict suffixes reproducible across platforms.

use crate::archive::{self, ArchiveFormat};
use crate::config::CompiledFilters;
use crate::file_category::Category;
use crate::file_organizer::{FileOrganizer, OrganizeError, OrganizeResult, rename_in_place};
use crate::naming::{conflict_key, existing_names, normalize_stem, pick_free_name, resolve_conflict};
use crate::report::{RunReport, Stage};
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Name of the temporary folder an archive is unpacked into.
const STAGING_DIR: &str = "_unpacking";

/// Sorts one root folder.
///
/// The root is explicit state carried by the organizer; nothing is global.
///
/// # Examples
///
/// ```no_run
/// use clean_folder::Organizer;
/// use std::path::Path;
///
/// let report = Organizer::new(Path::new("/home/user/Downloads"))?.run()?;
/// println!("moved {} files", report.moved_files.len());
/// # Ok::<(), clean_folder::OrganizeError>(())
/// ```
#[derive(Debug)]
pub struct Organizer {
    root: PathBuf,
    filters: CompiledFilters,
}

impl Organizer {
    /// Creates an organizer that processes every file under `root`.
    pub fn new(root: &Path) -> OrganizeResult<Self> {
        Self::with_filters(root, CompiledFilters::default())
    }

    /// Creates an organizer that skips files rejected by `filters`.
    ///
    /// Fails if `root` is not an existing directory.
    pub fn with_filters(root: &Path, filters: CompiledFilters) -> OrganizeResult<Self> {
        let metadata = fs::metadata(root).map_err(|e| OrganizeError::InvalidRootPath {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(OrganizeError::InvalidRootPath {
                path: root.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "root is not a directory"),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            filters,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a category folder (always a direct child of the root).
    pub fn category_path(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Runs all five stages.
    pub fn run(&self) -> OrganizeResult<RunReport> {
        self.run_observed(|_| {})
    }

    /// Runs all five stages, calling `on_stage` before each one starts.
    ///
    /// Only a failure to create the category folders aborts the run; every
    /// other failure is recorded in the report and the run continues.
    pub fn run_observed(&self, mut on_stage: impl FnMut(Stage)) -> OrganizeResult<RunReport> {
        let mut report = RunReport::new(self.root.clone());
        info!(root = %self.root.display(), "sorting folder");

        on_stage(Stage::CreateCategories);
        self.create_category_folders(&mut report)?;

        on_stage(Stage::MoveFiles);
        self.move_files(&mut report);

        on_stage(Stage::UnpackArchives);
        self.unpack_archives(&mut report);

        on_stage(Stage::DeleteEmptyFolders);
        self.delete_empty_folders(&mut report);

        on_stage(Stage::RenameFolders);
        self.rename_all_folders(&mut report);

        report.finish();
        info!(
            changes = report.total_changes(),
            failures = report.failures.len(),
            "sorting finished"
        );
        Ok(report)
    }

    /// Stage 1: creates any missing category folder.
    pub fn create_category_folders(&self, report: &mut RunReport) -> OrganizeResult<()> {
        for category in Category::ALL {
            let path = self.category_path(category);
            if path.is_dir() {
                continue;
            }
            fs::create_dir(&path).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: path.clone(),
                source: e,
            })?;
            debug!(path = %path.display(), "created category folder");
            report.record_created_folder(path);
        }
        Ok(())
    }

    /// Stage 2: moves recognized files into category folders.
    ///
    /// Directories named like a category are not entered. Unrecognized files
    /// stay where they are but get normalized names.
    pub fn move_files(&self, report: &mut RunReport) {
        info!("{}", Stage::MoveFiles);
        let walker = WalkDir::new(&self.root)
            .sort_by(files_first)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_category_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    report.record_failure(Stage::MoveFiles, &path, OrganizeError::from(e));
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_eligible(entry.path()) {
                continue;
            }

            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            match Category::classify(&name) {
                Some(category) => {
                    match FileOrganizer::relocate(path, &self.category_path(category)) {
                        Ok(new_path) => report.record_move(path, new_path, category),
                        Err(e) => report.record_failure(Stage::MoveFiles, path, e),
                    }
                }
                None => match FileOrganizer::normalize_in_place(path) {
                    Ok(new_path) => report.record_file_rename(path, new_path),
                    Err(e) => report.record_failure(Stage::MoveFiles, path, e),
                },
            }
        }
    }

    /// Stage 3: unpacks every archive directly inside `archives/`.
    ///
    /// An archive is deleted only after it was unpacked successfully. Its
    /// entries never replace anything already in `archives/`: a clashing
    /// entry gets a numeric suffix. Afterwards every file under `archives/`
    /// is normalized in place.
    pub fn unpack_archives(&self, report: &mut RunReport) {
        info!("{}", Stage::UnpackArchives);
        let folder = self.category_path(Category::Archives);
        let archives = match sorted_entries(&folder) {
            Ok(entries) => entries,
            Err(e) => {
                report.record_failure(
                    Stage::UnpackArchives,
                    &folder,
                    OrganizeError::DirectoryReadFailed {
                        path: folder.clone(),
                        source: e,
                    },
                );
                return;
            }
        };

        for path in archives {
            if !path.is_file()
                || ArchiveFormat::from_path(&path).is_none()
                || !self.is_eligible(&path)
            {
                continue;
            }

            let format = match unpack_archive(&path, &folder) {
                Ok(format) => format,
                Err(e) => {
                    report.record_failure(Stage::UnpackArchives, &path, e);
                    continue;
                }
            };
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(archive = %path.display(), "unpacked and removed");
                    report.record_extraction(path, format);
                }
                Err(e) => report.record_failure(
                    Stage::UnpackArchives,
                    &path,
                    OrganizeError::FileRemovalFailed {
                        path: path.clone(),
                        source: e,
                    },
                ),
            }
        }

        self.normalize_files_under(&folder, report);
    }

    /// Normalizes every file name below `folder` without moving anything.
    fn normalize_files_under(&self, folder: &Path, report: &mut RunReport) {
        for entry in WalkDir::new(folder).min_depth(1).sort_by(files_first) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(folder).to_path_buf();
                    report.record_failure(Stage::UnpackArchives, &path, OrganizeError::from(e));
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_eligible(entry.path()) {
                continue;
            }
            match FileOrganizer::normalize_in_place(entry.path()) {
                Ok(new_path) => report.record_file_rename(entry.path(), new_path),
                Err(e) => report.record_failure(Stage::UnpackArchives, entry.path(), e),
            }
        }
    }

    /// Stage 4: deletes empty folders, children before parents.
    ///
    /// Folders named like a category are never deleted, at any depth.
    pub fn delete_empty_folders(&self, report: &mut RunReport) {
        info!("{}", Stage::DeleteEmptyFolders);
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .sort_by(files_first);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    report.record_failure(
                        Stage::DeleteEmptyFolders,
                        &path,
                        OrganizeError::from(e),
                    );
                    continue;
                }
            };
            if !entry.file_type().is_dir() || is_category_dir(&entry) {
                continue;
            }

            let path = entry.path();
            let is_empty = match fs::read_dir(path) {
                Ok(mut entries) => entries.next().is_none(),
                Err(e) => {
                    report.record_failure(
                        Stage::DeleteEmptyFolders,
                        path,
                        OrganizeError::DirectoryReadFailed {
                            path: path.to_path_buf(),
                            source: e,
                        },
                    );
                    continue;
                }
            };
            if !is_empty {
                continue;
            }

            match fs::remove_dir(path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed empty folder");
                    report.record_removed_folder(path.to_path_buf());
                }
                Err(e) => report.record_failure(
                    Stage::DeleteEmptyFolders,
                    path,
                    OrganizeError::DirectoryRemovalFailed {
                        path: path.to_path_buf(),
                        source: e,
                    },
                ),
            }
        }
    }

    /// Stage 5: gives every non-category folder a normalized name.
    ///
    /// The whole folder name is treated as the stem. Folders are renamed
    /// children first, so paths still waiting in the walk stay valid; each
    /// rename only depends on its siblings, which makes the result the same
    /// as a top-down pass.
    pub fn rename_all_folders(&self, report: &mut RunReport) {
        info!("{}", Stage::RenameFolders);
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .sort_by(files_first);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    report.record_failure(Stage::RenameFolders, &path, OrganizeError::from(e));
                    continue;
                }
            };
            if !entry.file_type().is_dir() || is_category_dir(&entry) {
                continue;
            }

            let path = entry.path();
            match rename_folder(path) {
                Ok(Some(new_path)) => report.record_folder_rename(path.to_path_buf(), new_path),
                Ok(None) => {}
                Err(e) => report.record_failure(Stage::RenameFolders, path, e),
            }
        }
    }

    /// True if the file may be touched: not protected and not filtered out.
    fn is_eligible(&self, path: &Path) -> bool {
        if self.filters.is_protected(path) {
            debug!(path = %path.display(), "skipping protected file");
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let include = self.filters.should_include(relative);
        if !include {
            debug!(path = %path.display(), "skipping excluded file");
        }
        include
    }
}

/// Renames one folder to its normalized name. Returns the new path, or
/// `None` when the name was already normalized.
///
/// Category names count as taken, so a nested folder never turns into one
/// that later runs would treat as reserved.
fn rename_folder(path: &Path) -> OrganizeResult<Option<PathBuf>> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(OrganizeError::InvalidFileName {
            path: path.to_path_buf(),
        });
    };
    let name_str = name.to_string_lossy();
    let normalized = normalize_stem(&name_str);
    if normalized == name_str {
        return Ok(None);
    }

    let mut taken =
        existing_names(parent, Some(name)).map_err(|e| OrganizeError::DirectoryReadFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    taken.extend(Category::ALL.iter().map(|c| conflict_key(c.dir_name())));

    let new_path = parent.join(pick_free_name(&taken, &normalized));
    rename_in_place(path, &new_path)?;
    Ok(Some(new_path))
}

/// Walk order: files before directories, then by file name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_category_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_str().is_some_and(Category::is_category_name)
}

/// Entries directly inside `folder`, sorted by name.
fn sorted_entries(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(folder)? {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Unpacks `archive_path` into a fresh staging folder inside `folder`, then
/// moves each top-level entry into `folder` under a name nothing there uses.
///
/// The staging folder is removed afterwards, whether or not unpacking worked.
fn unpack_archive(archive_path: &Path, folder: &Path) -> OrganizeResult<ArchiveFormat> {
    let staging_name =
        resolve_conflict(folder, STAGING_DIR).map_err(|e| OrganizeError::DirectoryReadFailed {
            path: folder.to_path_buf(),
            source: e,
        })?;
    let staging = folder.join(staging_name);
    fs::create_dir(&staging).map_err(|e| OrganizeError::DirectoryCreationFailed {
        path: staging.clone(),
        source: e,
    })?;

    let result = archive::extract(archive_path, &staging)
        .map_err(OrganizeError::from)
        .and_then(|format| merge_entries(&staging, folder).map(|()| format));

    if let Err(e) = fs::remove_dir_all(&staging) {
        warn!(path = %staging.display(), error = %e, "failed to remove staging folder");
    }
    result
}

/// Moves every entry of `staging` into `folder`, suffixing clashing names.
fn merge_entries(staging: &Path, folder: &Path) -> OrganizeResult<()> {
    let entries = sorted_entries(staging).map_err(|e| OrganizeError::DirectoryReadFailed {
        path: staging.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Err(OrganizeError::InvalidFileName { path: entry });
        };
        let taken = existing_names(folder, None).map_err(|e| OrganizeError::DirectoryReadFailed {
            path: folder.to_path_buf(),
            source: e,
        })?;
        let free = pick_free_name(&taken, &name);
        if free != name {
            debug!(entry = %name, renamed = %free, "extracted entry clashes, suffixed");
        }

        let target = folder.join(&free);
        fs::rename(&entry, &target).map_err(|e| OrganizeError::FileMoveFailure {
            from: entry.clone(),
            to: target.clone(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn organizer(temp_dir: &TempDir) -> Organizer {
        Organizer::new(temp_dir.path()).expect("Failed to create organizer")
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).expect("Failed to create zip");
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("Failed to start zip entry");
            writer
                .write_all(content.as_bytes())
                .expect("Failed to write zip entry");
        }
        writer.finish().expect("Failed to finish zip");
    }

    fn listing(folder: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(folder)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_new_rejects_missing_root() {
        assert!(Organizer::new(Path::new("/non/existent/path")).is_err());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").expect("Failed to write file");

        assert!(matches!(
            Organizer::new(&file),
            Err(OrganizeError::InvalidRootPath { .. })
        ));
    }

    #[test]
    fn test_create_category_folders_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let organizer = organizer(&temp_dir);

        let mut report = RunReport::new(temp_dir.path().to_path_buf());
        organizer
            .create_category_folders(&mut report)
            .expect("Failed to create folders");
        assert_eq!(report.created_folders.len(), 5);
        for category in Category::ALL {
            assert!(organizer.category_path(category).is_dir());
        }

        let mut second = RunReport::new(temp_dir.path().to_path_buf());
        organizer
            .create_category_folders(&mut second)
            .expect("Failed to create folders");
        assert!(second.created_folders.is_empty());
    }

    #[test]
    fn test_move_files_skips_category_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let organizer = organizer(&temp_dir);
        let mut report = RunReport::new(base.to_path_buf());
        organizer.create_category_folders(&mut report).unwrap();

        fs::create_dir_all(base.join("images").join("raw")).unwrap();
        fs::write(base.join("images").join("raw").join("мій файл.txt"), "x").unwrap();

        organizer.move_files(&mut report);

        assert!(base.join("images").join("raw").join("мій файл.txt").exists());
        assert!(report.moved_files.is_empty());
    }

    #[test]
    fn test_delete_empty_folders_deepest_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir_all(base.join("a").join("b").join("c")).unwrap();
        fs::create_dir_all(base.join("keep")).unwrap();
        fs::write(base.join("keep").join("file"), "x").unwrap();

        let mut report = RunReport::new(base.to_path_buf());
        organizer(&temp_dir).delete_empty_folders(&mut report);

        assert!(!base.join("a").exists());
        assert!(base.join("keep").exists());
        assert_eq!(report.removed_folders.len(), 3);
    }

    #[test]
    fn test_delete_empty_folders_keeps_category_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir_all(base.join("audio")).unwrap();
        fs::create_dir_all(base.join("nested").join("archives")).unwrap();

        let mut report = RunReport::new(base.to_path_buf());
        organizer(&temp_dir).delete_empty_folders(&mut report);

        assert!(base.join("audio").is_dir());
        assert!(base.join("nested").join("archives").is_dir());
        assert!(report.removed_folders.is_empty());
    }

    #[test]
    fn test_rename_all_folders_nested() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir_all(base.join("старі речі").join("ще глибше")).unwrap();
        fs::write(base.join("старі речі").join("ще глибше").join("f"), "x").unwrap();

        let mut report = RunReport::new(base.to_path_buf());
        organizer(&temp_dir).rename_all_folders(&mut report);

        assert!(base.join("stari_rechi").join("shche_glybshe").join("f").exists());
        assert_eq!(report.renamed_folders.len(), 2);
    }

    #[test]
    fn test_rename_folder_resolves_sibling_conflict() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("my docs")).unwrap();
        fs::create_dir(base.join("my_docs")).unwrap();

        let mut report = RunReport::new(base.to_path_buf());
        organizer(&temp_dir).rename_all_folders(&mut report);

        assert!(base.join("my_docs").is_dir());
        assert!(base.join("my_docs_1").is_dir());
        assert!(!base.join("my docs").exists());
    }

    #[test]
    fn test_rename_folder_never_produces_category_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir_all(base.join("music").join("аудіо")).unwrap();

        let mut report = RunReport::new(base.to_path_buf());
        organizer(&temp_dir).rename_all_folders(&mut report);

        assert!(base.join("music").join("audio_1").is_dir());
    }

    #[test]
    fn test_unpack_archives_never_overwrites_existing_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let organizer = organizer(&temp_dir);
        let mut report = RunReport::new(temp_dir.path().to_path_buf());
        organizer.create_category_folders(&mut report).unwrap();
        let archives = organizer.category_path(Category::Archives);

        fs::write(archives.join("notes.txt"), "user data").unwrap();
        write_zip(
            &archives.join("backup.zip"),
            &[("notes.txt", "zip data"), ("pics/cat.png", "png")],
        );
        fs::create_dir(archives.join("pics")).unwrap();

        organizer.unpack_archives(&mut report);

        assert!(report.is_complete_success(), "{:?}", report.failures);
        assert_eq!(
            listing(&archives),
            vec!["notes.txt", "notes_1.txt", "pics", "pics_1"]
        );
        assert_eq!(fs::read_to_string(archives.join("notes.txt")).unwrap(), "user data");
        assert_eq!(fs::read_to_string(archives.join("notes_1.txt")).unwrap(), "zip data");
        assert!(archives.join("pics_1").join("cat.png").is_file());
    }

    #[test]
    fn test_unpack_archives_failed_archive_leaves_no_staging_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let organizer = organizer(&temp_dir);
        let mut report = RunReport::new(temp_dir.path().to_path_buf());
        organizer.create_category_folders(&mut report).unwrap();
        let archives = organizer.category_path(Category::Archives);
        fs::write(archives.join("broken.zip"), "not a zip").unwrap();

        organizer.unpack_archives(&mut report);

        assert_eq!(report.failures.len(), 1);
        assert!(report.extracted_archives.is_empty());
        assert_eq!(listing(&archives), vec!["broken.zip"]);
    }

    #[test]
    fn test_unpack_archives_normalizes_files_without_archives() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let organizer = organizer(&temp_dir);
        let mut report = RunReport::new(temp_dir.path().to_path_buf());
        organizer.create_category_folders(&mut report).unwrap();
        let archives = organizer.category_path(Category::Archives);
        fs::write(archives.join("мій лист.txt"), "x").unwrap();

        organizer.unpack_archives(&mut report);

        assert_eq!(listing(&archives), vec!["miy_lyst.txt"]);
        assert_eq!(report.renamed_files.len(), 1);
    }
}
