use std::fmt;
use std::path::{Path, PathBuf};

/// File extensions the player backend can open, lowercase, without the dot.
pub const VIDEO_EXTENSIONS: [&str; 11] = [
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "mpeg", "mpg", "ts", "m4v",
];

/// A discovered video file. Only constructible for allow-listed extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaFile {
    path: PathBuf,
    extension: String,
}

impl MediaFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let extension = supported_extension(&path)?;
        Some(Self { path, extension })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Lowercased extension of `path` if it is on the allow-list.
pub fn supported_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection_is_case_insensitive() {
        let file = MediaFile::from_path("/videos/Holiday.MKV").unwrap();
        assert_eq!(file.extension(), "mkv");
        assert_eq!(file.file_name(), "Holiday.MKV");
    }

    #[test]
    fn test_unsupported_extensions_rejected() {
        for name in ["notes.txt", "cover.jpg", "noext", "archive.mp4.zip"] {
            assert!(MediaFile::from_path(name).is_none(), "{} should be rejected", name);
        }
    }

    #[test]
    fn test_every_allow_listed_extension_accepted() {
        for ext in VIDEO_EXTENSIONS {
            let path = PathBuf::from(format!("clip.{}", ext));
            assert!(MediaFile::from_path(path).is_some(), "{} should be accepted", ext);
        }
    }
}
