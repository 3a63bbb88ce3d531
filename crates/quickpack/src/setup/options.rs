//! Typed view of the `setup` section

use std::{fmt, path::PathBuf};

use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, SeqAccess, Visitor},
};

/// Options recognized in the `setup` section; anything else is passed to the host verbatim
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SetupOptions {
    pub name: Option<String>,

    #[serde(alias = "use_requirements_txt")]
    pub use_requirements_file: bool,

    /// Requirements files to read; `requirements.txt` when present and nothing is given
    #[serde(deserialize_with = "one_or_many_opt")]
    pub requirements_files: Option<Vec<PathBuf>>,

    pub freeze_requirements: FreezeSetting,

    #[serde(alias = "version_module_paths", deserialize_with = "one_or_many")]
    pub version_sources: Vec<PathBuf>,

    #[serde(alias = "fixed_version")]
    pub version: Option<String>,

    pub require_existing_version_sources: bool,

    #[serde(alias = "module_level_scripts")]
    pub console_scripts: ConsoleScripts,

    #[serde(deserialize_with = "one_or_many")]
    pub manifest_includes: Vec<String>,

    #[serde(deserialize_with = "one_or_many")]
    pub manifest_excludes: Vec<String>,

    /// Replace the manifest with these lines
    pub manifest: Option<Vec<String>>,

    /// Append these lines to the manifest
    pub manifest_extra: Vec<String>,

    pub manifest_path: PathBuf,

    /// Manifest content to start from instead of the existing manifest
    pub manifest_template: Option<PathBuf>,

    #[serde(alias = "auto_find_packages")]
    pub auto_discover_packages: bool,

    pub packages: Option<Vec<String>>,

    pub top_packages: Option<Vec<String>>,

    pub install_requires: Vec<String>,

    pub long_description: Option<LongDescription>,

    pub bundle_helper: Option<BundleHelperOptions>,

    pub dynamic_requirements_file: PathBuf,

    pub include_package_data: bool,

    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            name: None,
            use_requirements_file: true,
            requirements_files: None,
            freeze_requirements: FreezeSetting::default(),
            version_sources: Vec::new(),
            version: None,
            require_existing_version_sources: false,
            console_scripts: ConsoleScripts::default(),
            manifest_includes: Vec::new(),
            manifest_excludes: Vec::new(),
            manifest: None,
            manifest_extra: Vec::new(),
            manifest_path: PathBuf::from(crate::manifest::DEFAULT_MANIFEST_PATH),
            manifest_template: None,
            auto_discover_packages: true,
            packages: None,
            top_packages: None,
            install_requires: Vec::new(),
            long_description: None,
            bundle_helper: None,
            dynamic_requirements_file: PathBuf::from(DYNAMIC_REQUIREMENTS_FILE),
            include_package_data: true,
            metadata: serde_json::Map::new(),
        }
    }
}

/// File the final dependency list is persisted to while packaging
pub const DYNAMIC_REQUIREMENTS_FILE: &str = "dynamic_requirements.txt";

/// `freeze_requirements: true` or `freeze_requirements: {index_url: ...}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FreezeSetting {
    Enabled(bool),
    Index {
        #[serde(alias = "pypi_server")]
        index_url: Option<String>,
    },
}

impl Default for FreezeSetting {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl FreezeSetting {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Enabled(enabled) => *enabled,
            Self::Index { .. } => true,
        }
    }

    /// Index configured for freezing, overriding the tool-wide default
    #[must_use]
    pub fn index_url(&self) -> Option<&str> {
        match self {
            Self::Index { index_url } => index_url.as_deref(),
            Self::Enabled(_) => None,
        }
    }
}

/// Either the description text itself or a file to read it from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LongDescription {
    File {
        filename: PathBuf,
        content_type: String,
    },
    Text(String),
}

/// A build helper archive copied next to the package as `<name>.v<version>.zip`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BundleHelperOptions {
    pub archive: PathBuf,
    pub name: String,
    pub version: String,
}

impl BundleHelperOptions {
    #[must_use]
    pub fn bundled_file_name(&self) -> String {
        format!("{}.v{}.zip", self.name, self.version)
    }

    #[must_use]
    pub fn manifest_pattern(&self) -> String {
        format!("{}.v*.zip", self.name)
    }
}

/// A console script name and the module it runs as `__main__`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleScript {
    pub name: String,
    pub module: String,
}

/// Console scripts in declaration order, duplicates preserved so they can be reported
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsoleScripts(pub Vec<ConsoleScript>);

impl ConsoleScripts {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsoleScript> {
        self.0.iter()
    }

    /// The first name declared more than once, if any
    #[must_use]
    pub fn first_duplicate(&self) -> Option<&str> {
        self.0.iter().enumerate().find_map(|(i, script)| {
            self.0[..i]
                .iter()
                .any(|earlier| earlier.name == script.name)
                .then_some(script.name.as_str())
        })
    }
}

impl<'de> Deserialize<'de> for ConsoleScripts {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScriptsVisitor;

        impl<'de> Visitor<'de> for ScriptsVisitor {
            type Value = ConsoleScripts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of script name to module, or a list of `name=module`")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ConsoleScripts::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut scripts = Vec::new();
                while let Some((name, module)) = map.next_entry::<String, String>()? {
                    scripts.push(ConsoleScript { name, module });
                }
                Ok(ConsoleScripts(scripts))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut scripts = Vec::new();
                while let Some(entry) = seq.next_element::<String>()? {
                    let (name, module) = entry.split_once('=').ok_or_else(|| {
                        de::Error::custom(format!("console script {entry:?} is not `name=module`"))
                    })?;
                    scripts.push(ConsoleScript {
                        name: name.trim().to_string(),
                        module: module.trim().to_string(),
                    });
                }
                Ok(ConsoleScripts(scripts))
            }
        }

        deserializer.deserialize_any(ScriptsVisitor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(single) => vec![single],
            OneOrMany::Many(many) => many,
        }
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<OneOrMany<T>>::deserialize(deserializer)?
        .map(Vec::from)
        .unwrap_or_default())
}

fn one_or_many_opt<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<OneOrMany<T>>::deserialize(deserializer)?.map(Vec::from))
}

impl SetupOptions {
    /// The manifest lines configured directly, as (replace mode, lines)
    #[must_use]
    pub fn configured_manifest_lines(&self) -> (bool, Vec<String>) {
        match &self.manifest {
            Some(lines) => (true, lines.clone()),
            None => (false, self.manifest_extra.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> SetupOptions {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = parse("{}");

        assert!(options.use_requirements_file);
        assert!(options.auto_discover_packages);
        assert!(options.include_package_data);
        assert!(!options.freeze_requirements.is_enabled());
        assert_eq!(options.manifest_path, PathBuf::from("MANIFEST.in"));
        assert_eq!(
            options.dynamic_requirements_file,
            PathBuf::from("dynamic_requirements.txt")
        );
    }

    #[test]
    fn test_aliases_and_single_values() {
        let options = parse(
            "
name: examplelib
use_requirements_txt: false
version_module_paths: examplelib/version.py
fixed_version: '1.0'
auto_find_packages: false
module_level_scripts:
  example: examplelib.cli
",
        );

        assert!(!options.use_requirements_file);
        assert_eq!(options.version_sources, vec![PathBuf::from("examplelib/version.py")]);
        assert_eq!(options.version.as_deref(), Some("1.0"));
        assert!(!options.auto_discover_packages);
        assert_eq!(
            options.console_scripts.0,
            vec![ConsoleScript {
                name: "example".to_string(),
                module: "examplelib.cli".to_string()
            }]
        );
    }

    #[test]
    fn test_freeze_setting_shapes() {
        assert!(parse("freeze_requirements: true").freeze_requirements.is_enabled());

        let options = parse("freeze_requirements:\n  pypi_server: https://mirror.example.com\n");
        assert!(options.freeze_requirements.is_enabled());
        assert_eq!(
            options.freeze_requirements.index_url(),
            Some("https://mirror.example.com")
        );
    }

    #[test]
    fn test_console_scripts_list_form_keeps_duplicates() {
        let options = parse("console_scripts:\n  - tool=a.cli\n  - other = b.main\n  - tool=c.cli\n");

        assert_eq!(options.console_scripts.0.len(), 3);
        assert_eq!(options.console_scripts.0[1].name, "other");
        assert_eq!(options.console_scripts.first_duplicate(), Some("tool"));
    }

    #[test]
    fn test_console_scripts_list_form_rejects_bad_entries() {
        let result: Result<SetupOptions, _> = serde_yaml::from_str("console_scripts: [broken]");

        assert!(result.is_err());
    }

    #[test]
    fn test_long_description_forms() {
        let options = parse("long_description:\n  filename: README.md\n  content_type: text/markdown\n");
        assert_eq!(
            options.long_description,
            Some(LongDescription::File {
                filename: PathBuf::from("README.md"),
                content_type: "text/markdown".to_string()
            })
        );

        let options = parse("long_description: Just text");
        assert_eq!(
            options.long_description,
            Some(LongDescription::Text("Just text".to_string()))
        );
    }

    #[test]
    fn test_unknown_keys_become_metadata() {
        let options = parse("name: lib\nauthor: Jo\nclassifiers: [a, b]\n");

        assert_eq!(options.metadata.get("author"), Some(&serde_json::json!("Jo")));
        assert_eq!(options.metadata.get("classifiers"), Some(&serde_json::json!(["a", "b"])));
        assert!(!options.metadata.contains_key("name"));
    }

    #[test]
    fn test_bundle_helper_names() {
        let bundle = BundleHelperOptions {
            archive: PathBuf::from("dist/helper.zip"),
            name: "helper_incorporated".to_string(),
            version: "2.1".to_string(),
        };

        assert_eq!(bundle.bundled_file_name(), "helper_incorporated.v2.1.zip");
        assert_eq!(bundle.manifest_pattern(), "helper_incorporated.v*.zip");
    }
}
