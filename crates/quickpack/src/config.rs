pub mod loader;
pub mod validate;
pub mod yaml;

use std::{num::NonZeroU64, path::PathBuf, sync::LazyLock, time::Duration};

use serde::Deserialize;
use url::Url;

pub use loader::{ApplyToConfig, ConfigLoadError, ConfigLoader};
pub use validate::ValidationResult;
pub use yaml::YamlLoader;

const PYTHON_DEFAULT: &str = "python3";
const SHELL_DEFAULT: &str = "/bin/sh";
const INDEX_URL_DEFAULT: &str = "https://pypi.org";
const VERBOSE_DEFAULT: bool = false;
const USE_COLORS_DEFAULT: bool = true;
const COMMAND_TIMEOUT_DEFAULT: NonZeroU64 = NonZeroU64::new(600).unwrap();

static DEFAULT_INDEX_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse(INDEX_URL_DEFAULT).expect("valid default index URL"));

/// Tool configuration: the config file with CLI arguments applied on top
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Interpreter that runs the host toolchain
    #[serde(default = "default_python")]
    pub(crate) python: String,

    #[serde(default = "default_shell")]
    pub(crate) shell: String,

    /// Seconds before an external command is killed
    #[serde(default = "default_command_timeout")]
    pub(crate) command_timeout: NonZeroU64,

    /// Package index used to freeze requirements
    #[serde(default = "default_index_url")]
    pub(crate) index_url: Url,

    /// Setup document, relative to the project root
    #[serde(default = "default_setup_file")]
    pub(crate) setup_file: PathBuf,

    #[serde(default)]
    pub(crate) verbose: bool,

    #[serde(default = "default_use_colors")]
    pub(crate) use_colors: bool,
}

fn default_python() -> String {
    PYTHON_DEFAULT.to_string()
}
fn default_shell() -> String {
    SHELL_DEFAULT.to_string()
}
fn default_command_timeout() -> NonZeroU64 {
    COMMAND_TIMEOUT_DEFAULT
}
fn default_index_url() -> Url {
    DEFAULT_INDEX_URL.clone()
}
fn default_setup_file() -> PathBuf {
    PathBuf::from(crate::setup::DEFAULT_SETUP_FILE)
}
fn default_use_colors() -> bool {
    USE_COLORS_DEFAULT
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfigBuilder::default().build()
    }
}

impl AppConfig {
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    #[must_use]
    pub fn shell(&self) -> &str {
        &self.shell
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout.into())
    }

    #[must_use]
    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    #[must_use]
    pub fn setup_file(&self) -> &PathBuf {
        &self.setup_file
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub fn use_colors(&self) -> bool {
        self.use_colors
    }

    pub fn python_mut(&mut self) -> &mut String {
        &mut self.python
    }

    pub fn index_url_mut(&mut self) -> &mut Url {
        &mut self.index_url
    }

    pub fn setup_file_mut(&mut self) -> &mut PathBuf {
        &mut self.setup_file
    }

    pub fn verbose_mut(&mut self) -> &mut bool {
        &mut self.verbose
    }

    pub fn use_colors_mut(&mut self) -> &mut bool {
        &mut self.use_colors
    }
}

/// Builder pattern for `AppConfig`
#[derive(Default, Debug)]
pub struct AppConfigBuilder {
    python: Option<String>,
    shell: Option<String>,
    command_timeout: Option<NonZeroU64>,
    index_url: Option<Url>,
    setup_file: Option<PathBuf>,
    verbose: Option<bool>,
    use_colors: Option<bool>,
}

impl AppConfigBuilder {
    #[must_use]
    pub fn python(mut self, python: &str) -> Self {
        self.python = Some(python.to_string());
        self
    }

    #[must_use]
    pub fn shell(mut self, shell: &str) -> Self {
        self.shell = Some(shell.to_string());
        self
    }

    #[must_use]
    pub fn command_timeout(mut self, timeout: NonZeroU64) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn index_url(mut self, url: Url) -> Self {
        self.index_url = Some(url);
        self
    }

    #[must_use]
    pub fn setup_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.setup_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    #[must_use]
    pub fn use_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = Some(use_colors);
        self
    }

    #[must_use]
    pub fn build(self) -> AppConfig {
        AppConfig {
            python: self.python.unwrap_or_else(default_python),
            shell: self.shell.unwrap_or_else(default_shell),
            command_timeout: self.command_timeout.unwrap_or(COMMAND_TIMEOUT_DEFAULT),
            index_url: self.index_url.unwrap_or_else(default_index_url),
            setup_file: self.setup_file.unwrap_or_else(default_setup_file),
            verbose: self.verbose.unwrap_or(VERBOSE_DEFAULT),
            use_colors: self.use_colors.unwrap_or(USE_COLORS_DEFAULT),
        }
    }
}
