//! Extraction settings loaded from `dfgraph.yaml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dataflow::{LanguageTag, DEFAULT_MAX_DEPTH};

/// Config file names searched in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["dfgraph.yaml", ".dfgraph.yaml"];

/// Largest accepted `max_depth`. The builder recurses once per nesting
/// level, and deeper caps overflow worker thread stacks.
pub const MAX_DEPTH_CEILING: usize = 4096;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DfgConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    /// Nesting depth past which subtrees are skipped.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Drop repeated (variable, index, sources) edges.
    #[serde(default = "default_true")]
    pub dedupe: bool,
    /// Emit the final variable state with each file.
    #[serde(default = "default_true")]
    pub include_state: bool,
    /// Emit the code token sequence with each file.
    #[serde(default = "default_true")]
    pub include_tokens: bool,
    /// Restrict directory runs to these language tags (empty = all).
    #[serde(default)]
    pub languages: Vec<String>,
    /// Glob patterns for paths to skip (e.g., "**/vendor/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Walk into dot-directories and read dot-files.
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_true() -> bool {
    true
}

impl Default for DfgConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            name: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            dedupe: true,
            include_state: true,
            include_tokens: true,
            languages: Vec::new(),
            excluded_paths: Vec::new(),
            include_hidden: false,
        }
    }
}

impl DfgConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: DfgConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Find a config file in `dir`, if any.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Load `explicit` if given, else a discovered file in `dir`, else defaults.
    pub fn load<P: AsRef<Path>>(explicit: Option<&Path>, dir: P) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(dir),
        };

        let config = match path {
            Some(path) => Self::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("loading config {}: {}", path.display(), e))?,
            None => Self::default(),
        };
        validate(&config)?;
        Ok(config)
    }

    /// The allowed languages, or `None` for all.
    pub fn language_filter(&self) -> anyhow::Result<Option<Vec<LanguageTag>>> {
        if self.languages.is_empty() {
            return Ok(None);
        }
        let tags = self
            .languages
            .iter()
            .map(|tag| tag.parse::<LanguageTag>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(tags))
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(&*path_str))
                .unwrap_or(false)
        })
    }
}

/// Validate a config for correctness.
pub fn validate(config: &DfgConfig) -> anyhow::Result<()> {
    if config.max_depth == 0 {
        anyhow::bail!("max_depth must be at least 1");
    }
    if config.max_depth > MAX_DEPTH_CEILING {
        anyhow::bail!(
            "max_depth {} exceeds the limit of {}",
            config.max_depth,
            MAX_DEPTH_CEILING
        );
    }

    for tag in &config.languages {
        tag.parse::<LanguageTag>()
            .map_err(|e| anyhow::anyhow!("invalid languages entry {:?}: {}", tag, e))?;
    }

    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
version: "1.0"
name: "corpus"
max_depth: 128
languages: [python, js]
excluded_paths:
  - "**/vendor/**"
"#;
        let config: DfgConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "corpus");
        assert_eq!(config.max_depth, 128);
        assert!(config.dedupe);
        assert!(config.include_state);
        assert_eq!(
            config.language_filter().unwrap(),
            Some(vec![LanguageTag::Python, LanguageTag::JavaScript])
        );
        assert!(config.is_path_excluded(Path::new("src/vendor/lib.py")));
        assert!(!config.is_path_excluded(Path::new("src/app.py")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: DfgConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.include_tokens);
        assert!(!config.include_hidden);
        assert_eq!(config.language_filter().unwrap(), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = DfgConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(validate(&zero).is_err());

        let huge = DfgConfig {
            max_depth: 1_000_000,
            ..Default::default()
        };
        let err = validate(&huge).unwrap_err().to_string();
        assert!(err.contains("4096"));

        let ceiling = DfgConfig {
            max_depth: MAX_DEPTH_CEILING,
            ..Default::default()
        };
        assert!(validate(&ceiling).is_ok());

        let unknown = DfgConfig {
            languages: vec!["fortran".to_string()],
            ..Default::default()
        };
        let err = validate(&unknown).unwrap_err().to_string();
        assert!(err.contains("fortran"));
    }

    #[test]
    fn test_discover_prefers_visible_file() {
        let temp = TempDir::new().unwrap();
        assert!(DfgConfig::discover(temp.path()).is_none());

        fs::write(temp.path().join(".dfgraph.yaml"), "name: hidden\n").unwrap();
        fs::write(temp.path().join("dfgraph.yaml"), "name: visible\n").unwrap();

        let config = DfgConfig::load(None, temp.path()).unwrap();
        assert_eq!(config.name, "visible");
    }
}
