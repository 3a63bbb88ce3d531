use std::path::PathBuf;

use config::FileFormat;
use tracing::debug;

use crate::{config::AppConfig, fs::FileSystem};

use super::loader::{ConfigLoadError, ConfigLoader};

pub struct YamlLoader<'a, F: FileSystem> {
    fs: &'a F,
}

impl<'a, F: FileSystem> YamlLoader<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }
}

impl<F: FileSystem> ConfigLoader for YamlLoader<'_, F> {
    fn load_config(&self) -> Result<AppConfig, ConfigLoadError> {
        let config_paths = self.find_config_file_paths()?;

        if config_paths.len() > 1 {
            return Err(ConfigLoadError::MultipleFound(
                config_paths
                    .into_iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>(),
            ));
        }

        let Some(config_path) = config_paths.first() else {
            debug!("No config file found, using defaults");
            return Ok(AppConfig::default());
        };

        let file_contents = self.fs.read_file(config_path)?;
        let config = config::Config::builder()
            .add_source(config::File::from_str(&file_contents, FileFormat::Yaml))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(expanded) = self.fs.expand_path(app_config.setup_file()) {
            app_config.setup_file = expanded;
        }

        debug!(path = %config_path.display(), "Loaded config file");
        Ok(app_config)
    }

    fn find_config_file_paths(&self) -> Result<Vec<PathBuf>, ConfigLoadError> {
        let config_dir = self.fs.config_dir()?;

        let paths = ["config.yaml", "config.yml"]
            .into_iter()
            .map(|name| config_dir.join(name))
            .filter(|path| self.fs.path_exists(path))
            .collect();

        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystemError, MockFileSystem};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const CONFIG_DIR: &str = "/home/test/.config/quickpack";

    mod find_config_file_paths {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_find_config_paths_multiple_formats() {
            let mut fs = MockFileSystem::default();
            let config_dir = Path::new(CONFIG_DIR);
            let yaml_path = config_dir.join("config.yaml");
            let yml_path = config_dir.join("config.yml");

            fs.mock_config_dir_ok(config_dir);
            fs.mock_path_exists(&yaml_path, true);
            fs.mock_path_exists(&yml_path, true);

            let loader = YamlLoader::new(&fs);
            let paths = loader.find_config_file_paths().unwrap();

            assert_eq!(paths, vec![yaml_path, yml_path]);
        }

        #[test]
        fn test_find_config_paths_no_config_dir() {
            let mut fs = MockFileSystem::default();
            fs.expect_config_dir()
                .return_once(|| Err(FileSystemError::HomeDirNotFound));

            let loader = YamlLoader::new(&fs);
            let result = loader.find_config_file_paths();

            assert!(matches!(
                result,
                Err(ConfigLoadError::FileSystemError(FileSystemError::HomeDirNotFound))
            ));
        }
    }

    mod load_config {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_load_config() {
            let mut fs = MockFileSystem::default();
            let config_yaml = r#"
                python: "python3.12"
                command_timeout: 120
                index_url: "https://mirror.example.com"
                setup_file: "~/shared/quickpack.yml"
            "#;
            fs.mock_config_file(Path::new(CONFIG_DIR), config_yaml);
            fs.mock_expand_path("~/shared/quickpack.yml", "/home/test/shared/quickpack.yml");

            let loader = YamlLoader::new(&fs);
            let config = loader.load_config().unwrap();

            assert_eq!(config.python(), "python3.12");
            assert_eq!(config.command_timeout().as_secs(), 120);
            assert_eq!(config.index_url().as_str(), "https://mirror.example.com/");
            assert_eq!(
                config.setup_file(),
                &PathBuf::from("/home/test/shared/quickpack.yml")
            );
        }

        #[test]
        fn test_load_config_not_found_uses_defaults() {
            let mut fs = MockFileSystem::default();
            let config_dir = Path::new(CONFIG_DIR);
            fs.mock_config_dir_ok(config_dir);
            fs.mock_path_exists(config_dir.join("config.yaml"), false);
            fs.mock_path_exists(config_dir.join("config.yml"), false);

            let loader = YamlLoader::new(&fs);
            let config = loader.load_config().unwrap();

            assert_eq!(config, AppConfig::default());
        }

        #[test]
        fn test_load_config_invalid_yaml() {
            let mut fs = MockFileSystem::default();
            let invalid_yaml = r#"
        python: "python3"
        invalid:yaml:format
    "#;
            fs.mock_config_file(Path::new(CONFIG_DIR), invalid_yaml);

            let loader = YamlLoader::new(&fs);
            let result = loader.load_config();

            match result {
                Err(ConfigLoadError::ConfigError(_)) => {}
                other => panic!("Expected ConfigError, got: {other:?}"),
            }
        }

        #[test]
        fn test_load_config_invalid_field_types() {
            let mut fs = MockFileSystem::default();
            let invalid_types_yaml = r#"
        command_timeout: "not-a-number"
    "#;
            fs.mock_config_file(Path::new(CONFIG_DIR), invalid_types_yaml);

            let loader = YamlLoader::new(&fs);

            assert!(loader.load_config().is_err());
        }

        #[test]
        fn test_multiple_files() {
            let mut fs = MockFileSystem::default();
            let config_dir = Path::new(CONFIG_DIR);
            fs.mock_config_dir_ok(config_dir);
            fs.mock_path_exists(config_dir.join("config.yaml"), true);
            fs.mock_path_exists(config_dir.join("config.yml"), true);

            let loader = YamlLoader::new(&fs);
            let err = loader.load_config();

            assert!(matches!(err, Err(ConfigLoadError::MultipleFound(_))));
        }
    }
}
