//! Name normalization and conflict resolution.
//!
//! Normalized names contain only ASCII letters, digits and underscores (plus
//! the preserved extension for files). Cyrillic letters are transliterated
//! through a fixed table; every other character becomes `_`.
//!
//! Conflict checks are case-insensitive and always re-read the folder, so
//! they see every rename made earlier in the same run.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

/// Cyrillic (Russian and Ukrainian) letters and their ASCII spelling.
const TRANSLITERATION_PAIRS: &[(char, &str)] = &[
    ('ї', "yi"),
    ('ё', "yo"),
    ('є', "ye"),
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "g"),
    ('д', "d"),
    ('е', "e"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "y"),
    ('і', "i"),
    ('й', "y"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "h"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shch"),
    ('ъ', ""),
    ('ы', "y"),
    ('ь', ""),
    ('э', "e"),
    ('ю', "yu"),
    ('я', "ya"),
    ('Ё', "Yo"),
    ('Є', "Ye"),
    ('Ї', "Yi"),
    ('А', "A"),
    ('Б', "B"),
    ('В', "V"),
    ('Г', "G"),
    ('Д', "D"),
    ('Е', "E"),
    ('Ж', "Zh"),
    ('З', "Z"),
    ('И', "I"),
    ('І', "I"),
    ('Й', "Y"),
    ('К', "K"),
    ('Л', "L"),
    ('М', "M"),
    ('Н', "N"),
    ('О', "O"),
    ('П', "P"),
    ('Р', "R"),
    ('С', "S"),
    ('Т', "T"),
    ('У', "U"),
    ('Ф', "F"),
    ('Х', "H"),
    ('Ц', "Ts"),
    ('Ч', "Ch"),
    ('Ш', "Sh"),
    ('Щ', "Shch"),
    ('Э', "E"),
    ('Ю', "Yu"),
    ('Я', "Ya"),
];

static TRANSLITERATION: LazyLock<HashMap<char, &'static str>> =
    LazyLock::new(|| TRANSLITERATION_PAIRS.iter().copied().collect());

/// Returns the ASCII replacement for a transliterable character.
pub fn transliterate(ch: char) -> Option<&'static str> {
    TRANSLITERATION.get(&ch).copied()
}

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Splits a base name into stem and extension (the extension keeps its dot).
///
/// The extension starts at the last `.`, unless every character before that
/// dot is also a dot: `.bashrc` and `..` have no extension.
///
/// # Examples
///
/// ```
/// use clean_folder::naming::split_extension;
///
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
/// assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
/// assert_eq!(split_extension("README"), ("README", ""));
/// ```
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if name[..index].chars().any(|ch| ch != '.') => name.split_at(index),
        _ => (name, ""),
    }
}

/// Rewrites every character of `stem` into the allowed alphabet.
///
/// A stem that transliterates to nothing (only soft signs) becomes `_`, so
/// the result is never empty and stays stable under repeated normalization.
pub fn normalize_stem(stem: &str) -> String {
    let mut normalized = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if is_allowed(ch) {
            normalized.push(ch);
        } else if let Some(replacement) = transliterate(ch) {
            normalized.push_str(replacement);
        } else {
            normalized.push('_');
        }
    }
    if normalized.is_empty() {
        normalized.push('_');
    }
    normalized
}

/// Normalizes a file name, keeping its extension verbatim.
///
/// # Examples
///
/// ```
/// use clean_folder::naming::normalize_name;
///
/// assert_eq!(normalize_name("фото.jpg"), "foto.jpg");
/// assert_eq!(normalize_name("my report (1).PDF"), "my_report__1_.PDF");
/// ```
pub fn normalize_name(file_name: &str) -> String {
    let (stem, extension) = split_extension(file_name);
    let mut normalized = normalize_stem(stem);
    normalized.push_str(extension);
    normalized
}

/// Key used to compare names for conflicts.
pub fn conflict_key(name: &str) -> String {
    name.to_lowercase()
}

/// Reads the current entry names of `folder` as conflict keys.
///
/// `exclude` names an entry that must not count as taken, typically the
/// entry that is about to be renamed.
pub fn existing_names(folder: &Path, exclude: Option<&OsStr>) -> io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(folder)? {
        let name = entry?.file_name();
        if exclude == Some(name.as_os_str()) {
            continue;
        }
        names.insert(conflict_key(&name.to_string_lossy()));
    }
    Ok(names)
}

/// Returns `candidate` if it is free, otherwise the first free
/// `stem_N.ext` for N = 1, 2, ...
pub fn pick_free_name(taken: &HashSet<String>, candidate: &str) -> String {
    if !taken.contains(&conflict_key(candidate)) {
        return candidate.to_string();
    }

    let (stem, extension) = split_extension(candidate);
    let mut counter: u64 = 1;
    loop {
        let name = format!("{stem}_{counter}{extension}");
        if !taken.contains(&conflict_key(&name)) {
            return name;
        }
        counter += 1;
    }
}

/// Resolves `candidate` against the current listing of `folder`.
pub fn resolve_conflict(folder: &Path, candidate: &str) -> io::Result<String> {
    Ok(pick_free_name(&existing_names(folder, None)?, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn is_normalized_stem(stem: &str) -> bool {
        !stem.is_empty() && stem.chars().all(is_allowed)
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(split_extension("a.b.c"), ("a.b", ".c"));
        assert_eq!(split_extension("trailing."), ("trailing", "."));
        assert_eq!(split_extension("..."), ("...", ""));
        assert_eq!(split_extension("..hidden.txt"), ("..hidden", ".txt"));
    }

    #[test]
    fn test_normalize_transliterates_cyrillic() {
        assert_eq!(normalize_name("фото.jpg"), "foto.jpg");
        assert_eq!(normalize_name("Щука.txt"), "Shchuka.txt");
        assert_eq!(normalize_name("Їжак"), "Yizhak");
        assert_eq!(normalize_name("пісня.mp3"), "pisnya.mp3");
    }

    #[test]
    fn test_normalize_soft_signs_vanish() {
        assert_eq!(normalize_name("сіль.txt"), "sil.txt");
        assert_eq!(normalize_name("ъь.txt"), "_.txt");
    }

    #[test]
    fn test_normalize_replaces_other_characters() {
        assert_eq!(normalize_name("hello world!.txt"), "hello_world_.txt");
        assert_eq!(normalize_name("café.doc"), "caf_.doc");
        assert_eq!(normalize_name("a-b+c"), "a_b_c");
        assert_eq!(normalize_name(".bashrc"), "_bashrc");
    }

    #[test]
    fn test_normalize_keeps_extension_verbatim() {
        assert_eq!(normalize_name("звіт.PDF"), "zvit.PDF");
        assert_eq!(normalize_name("data.tar.gz"), "data_tar.gz");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "фото.jpg",
            "my report (final).docx",
            "ъ.txt",
            ".profile",
            "..",
            "a.",
            "日本語のファイル.png",
            "Ёлка & Co.tar.gz",
            "",
        ];
        for sample in samples {
            let once = normalize_name(sample);
            assert_eq!(normalize_name(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_normalize_output_alphabet() {
        let samples = ["фото", "a b c", "😀😀", "Ґанок", "tab\tname", "x.y.z"];
        for sample in samples {
            let (stem, _) = split_extension(sample);
            assert!(is_normalized_stem(&normalize_stem(stem)), "{sample:?}");
        }
    }

    #[test]
    fn test_pick_free_name_without_conflict() {
        let taken: HashSet<String> = ["other.txt".to_string()].into_iter().collect();
        assert_eq!(pick_free_name(&taken, "report.txt"), "report.txt");
    }

    #[test]
    fn test_pick_free_name_increments_counter() {
        let taken: HashSet<String> = ["report.txt", "report_1.txt", "report_2.txt"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(pick_free_name(&taken, "report.txt"), "report_3.txt");
    }

    #[test]
    fn test_pick_free_name_is_case_insensitive() {
        let taken: HashSet<String> = [conflict_key("Report.TXT")].into_iter().collect();
        assert_eq!(pick_free_name(&taken, "report.txt"), "report_1.txt");
    }

    #[test]
    fn test_resolve_conflict_rereads_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path();

        assert_eq!(
            resolve_conflict(folder, "song.mp3").expect("resolve failed"),
            "song.mp3"
        );

        fs::write(folder.join("song.mp3"), "a").expect("Failed to write file");
        assert_eq!(
            resolve_conflict(folder, "song.mp3").expect("resolve failed"),
            "song_1.mp3"
        );

        fs::write(folder.join("song_1.mp3"), "b").expect("Failed to write file");
        assert_eq!(
            resolve_conflict(folder, "song.mp3").expect("resolve failed"),
            "song_2.mp3"
        );
    }

    #[test]
    fn test_existing_names_excludes_own_entry() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path();
        fs::write(folder.join("a.txt"), "a").expect("Failed to write file");
        fs::write(folder.join("b.txt"), "b").expect("Failed to write file");

        let names = existing_names(folder, Some(OsStr::new("a.txt"))).expect("listing failed");
        assert!(!names.contains("a.txt"));
        assert!(names.contains("b.txt"));
    }
}
