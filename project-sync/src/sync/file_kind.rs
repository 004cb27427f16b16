//! Upload classification (`fileCategory` / `fileFormat`) by file extension.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Archive,
    Text,
    Binary,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Archive => "archive",
            FileCategory::Text => "text",
            FileCategory::Binary => "binary",
        }
    }
}

const TEXT_EXT: &[&str] = &[
    "txt", "md", "html", "css", "js", "jsx", "ts", "tsx", "json", "yml", "yaml", "xml", "csv",
    "env", "gitignore", "sh", "py", "go", "java", "kt", "c", "cc", "cpp", "h", "hpp", "rs",
];
const IMAGE_EXT: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico"];
const VIDEO_EXT: &[&str] = &["mp4", "webm", "mov"];
const AUDIO_EXT: &[&str] = &["mp3", "wav", "ogg", "m4a"];
const ARCHIVE_EXT: &[&str] = &["zip", "tar", "gz", "tgz"];

/// Category and format for a POSIX path. Format is the lowercased
/// extension, or `bin` when there is none.
pub fn classify(path: &str) -> (FileCategory, String) {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = match name.rfind('.') {
        // `.gitignore` has no extension in the usual sense but is still text
        Some(0) => String::new(),
        Some(idx) => name[idx + 1..].to_ascii_lowercase(),
        None => String::new(),
    };
    let format = if ext.is_empty() { "bin".to_string() } else { ext };
    let f = format.as_str();

    let category = if IMAGE_EXT.contains(&f) {
        FileCategory::Image
    } else if VIDEO_EXT.contains(&f) {
        FileCategory::Video
    } else if AUDIO_EXT.contains(&f) {
        FileCategory::Audio
    } else if ARCHIVE_EXT.contains(&f) {
        FileCategory::Archive
    } else if TEXT_EXT.contains(&f) || path.ends_with(".gitignore") {
        FileCategory::Text
    } else {
        FileCategory::Binary
    };

    (category, format)
}
