/// File categorization by extension.
///
/// Every file name maps to exactly one of the five fixed categories or to
/// "uncategorized" (`None`), decided solely by its lowercased extension.
///
/// # Examples
///
/// ```
/// use clean_folder::file_category::Category;
///
/// assert_eq!(Category::classify("photo.JPG"), Some(Category::Images));
/// assert_eq!(Category::classify("song.flac"), Some(Category::Audio));
/// assert_eq!(Category::classify("README"), None);
/// ```
use crate::naming::split_extension;
use serde::Serialize;
use std::fmt;

/// Represents a destination category.
///
/// The declaration order is the classification order: if an extension ever
/// appeared in two categories, the earliest one would win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Archive files (ZIP, GZ, TAR, 7Z)
    Archives,
    /// Audio files (MP3, OGG, WAV, AMR, FLAC)
    Audio,
    /// Document files (DOC, DOCX, TXT, PDF, XLSX, PPTX, ODT)
    Documents,
    /// Image files (JPEG, PNG, JPG, SVG, WEBP)
    Images,
    /// Video files (AVI, MP4, MOV, MKV)
    Video,
}

impl Category {
    /// All categories in classification order.
    pub const ALL: [Category; 5] = [
        Category::Archives,
        Category::Audio,
        Category::Documents,
        Category::Images,
        Category::Video,
    ];

    /// Returns the folder name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use clean_folder::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Video.dir_name(), "video");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Archives => "archives",
            Category::Audio => "audio",
            Category::Documents => "documents",
            Category::Images => "images",
            Category::Video => "video",
        }
    }

    /// Returns the recognized extensions (lowercase, no dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Archives => &["zip", "gz", "tar", "7z"],
            Category::Audio => &["mp3", "ogg", "wav", "amr", "flac"],
            Category::Documents => &["doc", "docx", "txt", "pdf", "xlsx", "pptx", "odt"],
            Category::Images => &["jpeg", "png", "jpg", "svg", "webp"],
            Category::Video => &["avi", "mp4", "mov", "mkv"],
        }
    }

    /// Maps an extension (without the dot, any case) to a category.
    pub fn from_extension(ext: &str) -> Option<Category> {
        if ext.is_empty() {
            return None;
        }
        let ext = ext.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.extensions().contains(&ext.as_str()))
    }

    /// Classifies a file by its base name. `None` means uncategorized.
    pub fn classify(file_name: &str) -> Option<Category> {
        let (_, extension) = split_extension(file_name);
        Self::from_extension(extension.strip_prefix('.').unwrap_or(extension))
    }

    /// Returns true if `name` is exactly one of the reserved folder names.
    pub fn is_category_name(name: &str) -> bool {
        Self::ALL.iter().any(|category| category.dir_name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
