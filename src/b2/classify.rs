use std::fmt;

use serde::Serialize;
use tracing::debug;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".apng", ".avif", ".bmp", ".gif", ".heic", ".heif", ".ico", ".jfif", ".jpeg", ".jpg", ".png",
    ".svg", ".tif", ".tiff", ".webp",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".3gp", ".avi", ".flv", ".m4v", ".mkv", ".mov", ".mp4", ".mpeg", ".mpg", ".ogv", ".webm",
    ".wmv",
];

pub const AUDIO_EXTENSIONS: &[&str] = &[
    ".aac", ".aiff", ".flac", ".m4a", ".mid", ".midi", ".mp3", ".oga", ".ogg", ".opus", ".wav",
    ".weba", ".wma",
];

pub const TEXT_EXTENSIONS: &[&str] = &[
    ".csv", ".doc", ".docx", ".htm", ".html", ".json", ".md", ".odt", ".pdf", ".rtf", ".txt",
    ".xml",
];

/// Coarse content category of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    Image,
    Video,
    Audio,
    Text,
    Unset,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::Image => "Image",
            FileType::Video => "Video",
            FileType::Audio => "Audio",
            FileType::Text => "Text",
            FileType::Unset => "Unset",
        };
        f.write_str(name)
    }
}

/// Classify a file by its extension (without the leading dot)
///
/// Matching is exact and case-sensitive. Categories are tried in the order
/// image, video, audio, text.
pub fn classify(extension: &str) -> FileType {
    let dotted = format!(".{}", extension);
    let table: [(&[&str], FileType); 4] = [
        (IMAGE_EXTENSIONS, FileType::Image),
        (VIDEO_EXTENSIONS, FileType::Video),
        (AUDIO_EXTENSIONS, FileType::Audio),
        (TEXT_EXTENSIONS, FileType::Text),
    ];

    let file_type = table
        .iter()
        .find(|(list, _)| list.contains(&dotted.as_str()))
        .map(|(_, file_type)| *file_type)
        .unwrap_or(FileType::Unset);

    debug!("File Type Determined: {}", file_type);
    file_type
}

/// Last component of a path, splitting on both `/` and `\`
pub fn file_name_from_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Text after the last `.` of a file name, or the whole name if it has none
pub fn extension_of(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or(file_name)
}
