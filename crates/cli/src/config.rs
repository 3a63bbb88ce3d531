use quickpack::config::{AppConfig, ApplyToConfig};

use crate::cli::ClapCli;

impl ApplyToConfig for ClapCli {
    fn apply_to_config(&self, mut config: AppConfig) -> AppConfig {
        if let Some(python) = self.python.as_ref() {
            *config.python_mut() = python.clone();
        }

        if let Some(url) = self.index_url.as_ref() {
            *config.index_url_mut() = url.clone();
        }

        if let Some(setup_file) = self.setup_file.as_ref() {
            *config.setup_file_mut() = setup_file.clone();
        }

        // Flags can only switch these on or off relative to the file
        if self.verbose {
            *config.verbose_mut() = true;
        }
        if self.no_color {
            *config.use_colors_mut() = false;
        }

        config
    }
}
