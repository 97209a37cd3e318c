//! Source discovery: expanding inputs into image file lists.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::format;

/// Expand a source path into image files.
///
/// A directory expands to the image files it contains, filtered by the
/// supported extension set and sorted by path so submission order is
/// deterministic; `recursive` controls whether subdirectories are walked.
/// Anything else passes through untouched: explicit files are always
/// attempted (the decoder judges the contents), and missing paths surface
/// as per-job failures instead of silently vanishing from the batch.
pub fn discover(path: &Path, recursive: bool) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut walker = WalkDir::new(path).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let entry_path = entry.path();
        if entry_path.is_file() && format::is_supported_extension(entry_path) {
            files.push(entry_path.to_path_buf());
        }
    }

    // Sort by path for deterministic ordering
    files.sort();
    debug!(count = files.len(), path = %path.display(), "discovered sources");
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_directory_expansion_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.png"));
        touch(&dir.path().join("a.jpg"));
        touch(&dir.path().join("notes.txt"));

        let found = discover(dir.path(), false);
        assert_eq!(
            found,
            vec![dir.path().join("a.jpg"), dir.path().join("b.png")]
        );
    }

    #[test]
    fn test_recursion_flag() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.png"));
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        touch(&nested.join("deep.webp"));

        let shallow = discover(dir.path(), false);
        assert_eq!(shallow, vec![dir.path().join("top.png")]);

        let deep = discover(dir.path(), true);
        assert_eq!(deep, vec![nested.join("deep.webp"), dir.path().join("top.png")]);
    }

    #[test]
    fn test_explicit_paths_pass_through() {
        // The decoder owns the verdict on these, not discovery
        let missing = Path::new("/no/such/file.png");
        assert_eq!(discover(missing, false), vec![missing.to_path_buf()]);

        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("photo.dat");
        touch(&odd);
        assert_eq!(discover(&odd, false), vec![odd.clone()]);
    }
}
