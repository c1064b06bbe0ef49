/// File categorization by extension.
///
/// Maps a file extension to a broad [`Category`] (images, documents, archives, ...) through a
/// fixed lookup table. Extensions are compared case-insensitively with any leading dot removed,
/// and anything the table does not list falls into [`Category::Other`].
///
/// # Examples
///
/// ```
/// use sorter::file_category::{Category, classify};
///
/// assert_eq!(classify("png"), Category::Images);
/// assert_eq!(classify(".PDF"), Category::Documents);
/// assert_eq!(classify("unknownext"), Category::Other);
/// assert_eq!(classify(""), Category::Other);
/// ```
use std::collections::HashSet;
use std::path::Path;

/// Represents a broad file category.
///
/// When sorting into categories, each category becomes a subfolder of the destination named
/// after [`Category::dir_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Image files (PNG, JPG, GIF, etc.)
    Images,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Video files (MP4, MKV, AVI, etc.)
    Videos,
    /// Document files (PDF, DOCX, TXT, etc.)
    Documents,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    Archives,
    /// Code/Source files (Rust, Python, JavaScript, etc.)
    Code,
    /// Spreadsheet files (XLSX, CSV, ODS, etc.)
    Spreadsheets,
    /// Presentation files (PPTX, ODP, etc.)
    Presentations,
    /// Font files (TTF, OTF, WOFF, etc.)
    Fonts,
    /// Unknown or uncategorized files
    Other,
}

/// Category → extensions. Extensions are lower-case and disjoint across rows.
const CATEGORY_TABLE: &[(Category, &[&str])] = &[
    (
        Category::Images,
        &[
            "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tif", "tiff", "ico", "heic",
            "heif", "raw", "cr2", "nef",
        ],
    ),
    (
        Category::Audio,
        &["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma", "opus", "aiff"],
    ),
    (
        Category::Videos,
        &["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "3gp", "m4v", "mpg", "mpeg"],
    ),
    (
        Category::Documents,
        &["pdf", "txt", "doc", "docx", "html", "htm", "md", "rtf", "odt", "tex", "epub"],
    ),
    (
        Category::Archives,
        &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz", "zst", "iso"],
    ),
    (
        Category::Code,
        &[
            "py", "java", "c", "cpp", "h", "hpp", "js", "ts", "rs", "go", "sh", "bash", "json",
            "xml", "yaml", "yml", "toml", "css",
        ],
    ),
    (Category::Spreadsheets, &["csv", "xls", "xlsx", "ods"]),
    (Category::Presentations, &["ppt", "pptx", "odp", "key"]),
    (Category::Fonts, &["ttf", "otf", "woff", "woff2"]),
];

impl Category {
    /// Every category, in table order, ending with [`Category::Other`].
    pub const ALL: [Category; 10] = [
        Category::Images,
        Category::Audio,
        Category::Videos,
        Category::Documents,
        Category::Archives,
        Category::Code,
        Category::Spreadsheets,
        Category::Presentations,
        Category::Fonts,
        Category::Other,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use sorter::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "Images");
    /// assert_eq!(Category::Audio.dir_name(), "Audio");
    /// assert_eq!(Category::Other.dir_name(), "Other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Audio => "Audio",
            Category::Videos => "Videos",
            Category::Documents => "Documents",
            Category::Archives => "Archives",
            Category::Code => "Code",
            Category::Spreadsheets => "Spreadsheets",
            Category::Presentations => "Presentations",
            Category::Fonts => "Fonts",
            Category::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Normalizes an extension for lookup: trimmed, lower-cased, leading `*` and dots removed.
///
/// `"*.JPG"`, `".jpg"` and `"jpg"` all normalize to `"jpg"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim()
        .trim_start_matches('*')
        .trim_start_matches('.')
        .to_lowercase()
}

/// Returns the lower-cased final extension of `path`, or an empty string if it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Maps a file extension to its category.
///
/// Total over all strings: the empty string and anything unlisted map to [`Category::Other`].
pub fn classify(extension: &str) -> Category {
    let ext = normalize_extension(extension);
    if ext.is_empty() {
        return Category::Other;
    }

    CATEGORY_TABLE
        .iter()
        .find(|(_, extensions)| extensions.contains(&ext.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Restricts which extensions become candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeFilter {
    /// Every file is a candidate.
    #[default]
    All,
    /// Only files whose normalized extension is in the set.
    Only(HashSet<String>),
}

impl TypeFilter {
    /// Builds a filter from user-supplied extensions (`jpg`, `.jpg`, `*.JPG`, ...).
    ///
    /// Entries that normalize to nothing are dropped; if none remain the filter is [`TypeFilter::All`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sorter::file_category::TypeFilter;
    ///
    /// let filter = TypeFilter::from_extensions(["*.JPG", "png"]);
    /// assert!(filter.allows("jpg"));
    /// assert!(!filter.allows("txt"));
    /// assert_eq!(TypeFilter::from_extensions(Vec::<String>::new()), TypeFilter::All);
    /// ```
    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: HashSet<String> = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();

        if set.is_empty() {
            TypeFilter::All
        } else {
            TypeFilter::Only(set)
        }
    }

    /// Returns true if a file with this (already lower-cased) extension passes the filter.
    pub fn allows(&self, extension: &str) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(set) => set.contains(extension),
        }
    }
}
