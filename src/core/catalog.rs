use std::path::{Path, PathBuf};

use crate::core::error::ShuffleError;
use crate::core::media::MediaFile;

/// Lists every regular file below a root. The catalog applies the
/// extension filter itself.
pub trait FileWalker: Send + Sync {
    fn list_files_recursive(&self, root: &Path) -> std::io::Result<Vec<PathBuf>>;
}

/// Walks the real filesystem with `std::fs::read_dir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWalker;

impl FileWalker for FsWalker {
    fn list_files_recursive(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                // The root itself must be readable; unreadable sub-folders are skipped
                Err(e) if dir != root => {
                    log::warn!("Skipping unreadable folder {}: {}", dir.display(), e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            for entry in entries {
                let entry = entry?;
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }

        Ok(files)
    }
}

/// Every playable file found under the selected folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaCatalog {
    root: Option<PathBuf>,
    files: Vec<MediaFile>,
}

impl MediaCatalog {
    /// Rebuilds the catalog from scratch. An existing folder without any
    /// matching file yields an empty catalog, not an error.
    pub fn scan(root: &Path, walker: &dyn FileWalker) -> Result<Self, ShuffleError> {
        if !root.is_dir() {
            return Err(ShuffleError::NotFound(root.to_path_buf()));
        }

        let paths = walker
            .list_files_recursive(root)
            .map_err(|source| ShuffleError::Io {
                path: root.to_path_buf(),
                source,
            })?;

        let mut files: Vec<MediaFile> = paths.into_iter().filter_map(MediaFile::from_path).collect();
        files.sort();

        log::info!("Found {} video file(s) under {}", files.len(), root.display());

        Ok(Self {
            root: Some(root.to_path_buf()),
            files,
        })
    }

    pub fn from_files(files: Vec<MediaFile>) -> Self {
        Self { root: None, files }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    pub fn get(&self, index: usize) -> Option<&MediaFile> {
        self.files.get(index)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_scan_filters_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("A.mp4"));
        touch(&dir.path().join("B.mkv"));
        touch(&dir.path().join("C.txt"));

        let catalog = MediaCatalog::scan(dir.path(), &FsWalker).unwrap();
        assert_eq!(catalog.len(), 2);

        let names: Vec<String> = catalog.files().iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["A.mp4", "B.mkv"]);
    }

    #[test]
    fn test_scan_recurses_into_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.mov"));
        touch(&dir.path().join("season1/ep1.MP4"));
        touch(&dir.path().join("season1/extras/deep/clip.webm"));
        touch(&dir.path().join("season1/extras/readme.md"));

        let catalog = MediaCatalog::scan(dir.path(), &FsWalker).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.root(), Some(dir.path()));
    }

    #[test]
    fn test_scan_empty_folder_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("notes.txt"));

        let catalog = MediaCatalog::scan(dir.path(), &FsWalker).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_scan_missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = MediaCatalog::scan(&missing, &FsWalker);
        assert!(matches!(result, Err(ShuffleError::NotFound(path)) if path == missing));
    }

    #[test]
    fn test_scan_file_as_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mp4");
        touch(&file);

        assert!(matches!(MediaCatalog::scan(&file, &FsWalker), Err(ShuffleError::NotFound(_))));
    }

    #[test]
    fn test_scan_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z.mp4", "a.mp4", "m/b.avi", "c.ts"] {
            touch(&dir.path().join(name));
        }

        let first = MediaCatalog::scan(dir.path(), &FsWalker).unwrap();
        let second = MediaCatalog::scan(dir.path(), &FsWalker).unwrap();
        assert_eq!(first, second);
    }
}
