//! Folder scanning.

use std::path::{Path, PathBuf};

/// List the media files directly inside `folder`, sorted by file name.
///
/// `extensions` are compared case-insensitively and without the dot.
pub fn list_media_files(folder: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir_entry in std::fs::read_dir(folder)? {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        if !dir_entry.file_type()?.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_matching_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", "notes.txt", "c.avi"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("cropped.mp4")).unwrap();

        let exts = vec!["mp4".to_string(), "avi".to_string(), "mov".to_string()];
        let files = list_media_files(dir.path(), &exts).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4", "c.avi"]);
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let exts = vec!["mp4".to_string()];
        assert!(list_media_files(Path::new("/definitely/not/here"), &exts).is_err());
    }
}
