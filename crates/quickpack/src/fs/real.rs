// Real file system adapter implementation

use std::{
    fs,
    path::{Path, PathBuf},
};

use etcetera::{AppStrategy, AppStrategyArgs, choose_app_strategy};

use super::filesystem::{FileSystem, FileSystemError};

/// Environment variable that overrides where the tool looks for its own `config.yaml`
pub const CONFIG_DIR_ENV: &str = "QUICKPACK_CONFIG_DIR";

/// Real file system implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_file(&self, path: &Path) -> Result<String, FileSystemError> {
        fs::read_to_string(path).map_err(|e| FileSystemError::io(path, e))
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
        fs::read(path).map_err(|e| FileSystemError::io(path, e))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FileSystemError> {
        fs::write(path, data).map_err(|e| FileSystemError::io(path, e))
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_file(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::remove_file(path).map_err(|e| FileSystemError::io(path, e))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::remove_dir_all(path).map_err(|e| FileSystemError::io(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::create_dir_all(path).map_err(|e| FileSystemError::io(path, e))
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileSystemError> {
        let entries = fs::read_dir(path).map_err(|e| FileSystemError::io(path, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FileSystemError::io(path, e))?;
            paths.push(entry.path());
        }
        paths.sort();

        Ok(paths)
    }

    fn expand_path(&self, path: &Path) -> Result<PathBuf, FileSystemError> {
        let binding = path.to_string_lossy();
        let expanded = shellexpand::tilde(&binding);

        Ok(PathBuf::from(expanded.as_ref()))
    }

    fn config_dir(&self) -> Result<PathBuf, FileSystemError> {
        // Check for environment variable override first
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        choose_app_strategy(AppStrategyArgs {
            top_level_domain: "io".to_string(),
            author: "quickpack".to_string(),
            app_name: "quickpack".to_string(),
        })
        .map(|xdg| xdg.config_dir())
        .map_err(|_| FileSystemError::HomeDirNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_path_exists() {
        let fs = RealFileSystem;

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");

        assert!(!fs.path_exists(&file_path));
        File::create(&file_path).unwrap();
        assert!(fs.path_exists(&file_path));
        assert!(fs.is_file(&file_path));
        assert!(!fs.is_dir(&file_path));
    }

    #[test]
    fn test_list_directory_is_sorted() {
        let fs = RealFileSystem;

        let dir = tempdir().unwrap();
        let file_b = dir.path().join("b.txt");
        let file_a = dir.path().join("a.txt");

        File::create(&file_b).unwrap();
        File::create(&file_a).unwrap();

        let paths = fs.list_directory(dir.path()).unwrap();

        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn test_read_and_write_bytes() {
        let fs = RealFileSystem;

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("data.bin");

        fs.write_file(&file_path, b"\x00\x01binary\xff").unwrap();
        assert_eq!(fs.read_bytes(&file_path).unwrap(), b"\x00\x01binary\xff");

        let non_existent = dir.path().join("non_existent.txt");
        let err = fs.read_file(&non_existent).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_does_not_create_parent_directories() {
        let fs = RealFileSystem;

        let dir = tempdir().unwrap();
        let nested = dir.path().join("missing").join("file.txt");

        let err = fs.write_file(&nested, b"content").unwrap_err();
        assert!(matches!(err, FileSystemError::Io { .. }));
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_remove_file_and_dir() {
        let fs = RealFileSystem;

        let dir = tempdir().unwrap();
        let sub = dir.path().join("pkg.egg-info");
        fs.create_dir_all(&sub).unwrap();
        fs.write_file(&sub.join("SOURCES.txt"), b"stale").unwrap();
        let file = dir.path().join("file.txt");
        fs.write_file(&file, b"x").unwrap();

        fs.remove_file(&file).unwrap();
        fs.remove_dir_all(&sub).unwrap();

        assert!(!file.exists());
        assert!(!sub.exists());
        assert!(fs.remove_file(&file).unwrap_err().is_not_found());
    }

    #[test]
    fn test_expand_path_keeps_plain_paths() {
        let fs = RealFileSystem;

        let expanded = fs.expand_path(Path::new("relative/setup.yml")).unwrap();
        assert_eq!(expanded, PathBuf::from("relative/setup.yml"));
    }
}
