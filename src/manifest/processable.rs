//! Processability check

use std::path::Path;

use super::types::MANIFEST_FILE_NAME;

/// An unpacked input tree can be rendered when `manifest.xml` sits at its
/// top level as a regular file. The manifest is not parsed here.
pub fn is_processable(input_dir: &Path) -> bool {
    std::fs::symlink_metadata(input_dir.join(MANIFEST_FILE_NAME))
        .map(|meta| meta.file_type().is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_processable_with_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), "<manifest/>").unwrap();

        assert!(is_processable(dir.path()));
    }

    #[test]
    fn test_not_processable_without_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("book.ditamap"), "<map/>").unwrap();

        assert!(!is_processable(dir.path()));
    }

    #[test]
    fn test_nested_manifest_does_not_count() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join(MANIFEST_FILE_NAME), "<manifest/>").unwrap();

        assert!(!is_processable(dir.path()));
    }

    #[test]
    fn test_manifest_directory_does_not_count() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(MANIFEST_FILE_NAME)).unwrap();

        assert!(!is_processable(dir.path()));
    }

    #[test]
    fn test_missing_input_dir() {
        assert!(!is_processable(Path::new("/nonexistent/input")));
    }
}
