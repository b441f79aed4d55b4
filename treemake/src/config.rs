//! Project configuration (`treemake.yml`).
//!
//! ```yaml
//! options:
//!   jobs: 4
//! modes:
//!   production:
//!     www_root: https://cdn.example.com/
//! nodes:
//!   - path: pages/index
//!     targets:
//!       - target: "?.js"
//!         tech: concat
//!         sources: [index.src.js]
//!         depends: ["blocks/button:?.js"]
//! ```
//!
//! Options are layered: the base `options` map is overridden key by key by
//! the map of the selected mode, then resolved once into [`MakeOptions`].

use crate::error::ConfigError;
use crate::node::DEFAULT_WWW_ROOT;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "treemake.yml";

/// Mode used when none is given.
pub const DEFAULT_MODE: &str = "development";

/// Untyped option map as written in the configuration.
pub type OptionMap = BTreeMap<String, serde_yaml::Value>;

/// Parsed `treemake.yml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Base options
    #[serde(default)]
    pub options: OptionMap,

    /// Per-mode overrides of the base options
    #[serde(default)]
    pub modes: BTreeMap<String, OptionMap>,

    /// Declared build directories
    #[serde(default)]
    pub nodes: Vec<NodeDecl>,
}

/// One declared build directory
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDecl {
    /// Directory relative to the project root
    pub path: String,

    /// Targets produced in this directory
    #[serde(default)]
    pub targets: Vec<TargetDecl>,
}

/// One target declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    /// Target name, `?` is replaced by the node basename
    pub target: String,

    /// Tech producing the target
    pub tech: String,

    /// Source files relative to the node directory
    #[serde(default)]
    pub sources: Vec<String>,

    /// `target` in the same node or `node/path:target`
    #[serde(default)]
    pub depends: Vec<String>,

    /// Tech options
    #[serde(default)]
    pub options: OptionMap,
}

/// Resolved platform options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MakeOptions {
    /// Worker pool size
    pub jobs: usize,

    /// Prefix for public asset URLs
    pub www_root: String,

    /// Cache file, relative to the project root
    pub cache_file: PathBuf,
}

impl Default for MakeOptions {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
            www_root: DEFAULT_WWW_ROOT.to_string(),
            cache_file: PathBuf::from(".treemake/cache.json"),
        }
    }
}

impl ProjectConfig {
    /// Read `treemake.yml` from `root`.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` if the file cannot be read, `ConfigError::Yaml` if
    /// it is malformed.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&text)
    }

    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// `ConfigError::Yaml` if the document is malformed.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Base options overridden by those of `mode`.
    #[must_use]
    pub fn layered_options(&self, mode: &str) -> OptionMap {
        let mut merged = self.options.clone();
        match self.modes.get(mode) {
            Some(overrides) => merged.extend(overrides.clone()),
            None => debug!("Mode '{}' has no overrides", mode),
        }
        merged
    }

    /// Typed options for `mode`. A `jobs` of 0 means one worker per CPU.
    ///
    /// # Errors
    ///
    /// `ConfigError::Yaml` if an option has the wrong type.
    pub fn resolve(&self, mode: &str) -> Result<MakeOptions, ConfigError> {
        let mapping: serde_yaml::Mapping = self
            .layered_options(mode)
            .into_iter()
            .map(|(key, value)| (serde_yaml::Value::String(key), value))
            .collect();
        let mut options: MakeOptions = serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))?;
        if options.jobs == 0 {
            options.jobs = num_cpus::get();
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
options:
  jobs: 2
  www_root: /static/
modes:
  production:
    www_root: https://cdn.example.com/
    jobs: 8
nodes:
  - path: blocks/button
    targets:
      - target: "?.js"
        tech: concat
        sources: [button.src.js]
        options:
          separator: ";"
  - path: pages/index
    targets:
      - target: "?.js"
        tech: concat
        depends: ["blocks/button:?.js"]
"#;

    #[test]
    fn test_parse_nodes() {
        let config = ProjectConfig::from_yaml(DOC).unwrap();
        assert_eq!(config.nodes.len(), 2);
        let button = &config.nodes[0].targets[0];
        assert_eq!(button.target, "?.js");
        assert_eq!(button.sources, vec!["button.src.js"]);
        assert!(button.options.contains_key("separator"));
        assert_eq!(config.nodes[1].targets[0].depends, vec!["blocks/button:?.js"]);
    }

    #[test]
    fn test_base_options() {
        let config = ProjectConfig::from_yaml(DOC).unwrap();
        let options = config.resolve(DEFAULT_MODE).unwrap();
        assert_eq!(options.jobs, 2);
        assert_eq!(options.www_root, "/static/");
        assert_eq!(options.cache_file, PathBuf::from(".treemake/cache.json"));
    }

    #[test]
    fn test_mode_overrides_base() {
        let config = ProjectConfig::from_yaml(DOC).unwrap();
        let options = config.resolve("production").unwrap();
        assert_eq!(options.jobs, 8);
        assert_eq!(options.www_root, "https://cdn.example.com/");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ProjectConfig::from_yaml("{}").unwrap();
        let options = config.resolve(DEFAULT_MODE).unwrap();
        assert_eq!(options, MakeOptions::default());
    }

    #[test]
    fn test_wrong_option_type() {
        let config = ProjectConfig::from_yaml("options:\n  jobs: many\n").unwrap();
        assert!(matches!(config.resolve(DEFAULT_MODE), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ProjectConfig::from_yaml("nodes:\n  - path: a\n    tragets: []\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }
}
