use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;
use crate::traversal::ScanLimits;

/// Project-level config file, looked up in the current directory.
pub const PROJECT_CONFIG_FILE: &str = "pinwalk.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ConfigParseError
    }
}

/// One config file as written: every key optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    #[serde(default)]
    pub source_base_url: Option<String>,
    #[serde(default)]
    pub git_program: Option<String>,
    #[serde(default)]
    pub max_actions: Option<usize>,
    #[serde(default)]
    pub output: Option<String>,
}

impl ConfigLayer {
    /// Fill unset keys of `self` from `lower`.
    #[must_use]
    pub fn over(self, lower: Self) -> Self {
        Self {
            workspace: self.workspace.or(lower.workspace),
            source_base_url: self.source_base_url.or(lower.source_base_url),
            git_program: self.git_program.or(lower.git_program),
            max_actions: self.max_actions.or(lower.max_actions),
            output: self.output.or(lower.output),
        }
    }
}

/// Effective settings for a scan after layering and defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory that receives every working copy.
    pub workspace: PathBuf,
    /// Host that `owner/repository` paths are appended to.
    pub source_base_url: String,
    pub git_program: String,
    /// `0` means unlimited.
    pub max_actions: usize,
    pub output: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from_layer(ConfigLayer::default())
    }
}

impl ScanConfig {
    #[must_use]
    pub fn from_layer(layer: ConfigLayer) -> Self {
        Self {
            workspace: layer.workspace.unwrap_or_else(default_workspace),
            source_base_url: layer
                .source_base_url
                .map_or_else(default_source_base_url, |url| {
                    url.trim_end_matches('/').to_string()
                }),
            git_program: layer.git_program.unwrap_or_else(default_git_program),
            max_actions: layer.max_actions.unwrap_or(DEFAULT_MAX_ACTIONS),
            output: layer.output,
        }
    }

    #[must_use]
    pub const fn limits(&self) -> ScanLimits {
        if self.max_actions == 0 {
            ScanLimits::unlimited()
        } else {
            ScanLimits::with_max_actions(self.max_actions)
        }
    }
}

/// Read one layer. A missing file is an empty layer.
///
/// # Errors
///
/// [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
    if !path.exists() {
        return Ok(ConfigLayer::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<ConfigLayer>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `./pinwalk.toml` relative to `project_root`.
///
/// # Errors
///
/// See [`load_layer`].
pub fn load_project_config(project_root: &Path) -> Result<ConfigLayer, ConfigError> {
    load_layer(&project_root.join(PROJECT_CONFIG_FILE))
}

/// `<config_dir>/pinwalk/config.toml`, if a config directory exists.
///
/// # Errors
///
/// See [`load_layer`].
pub fn load_user_config() -> Result<ConfigLayer, ConfigError> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigLayer::default());
    };
    load_layer(&config_dir.join("pinwalk/config.toml"))
}

/// Project config over user config over defaults.
///
/// # Errors
///
/// See [`load_layer`].
pub fn resolve_config(project_root: &Path) -> Result<ScanConfig, ConfigError> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;
    Ok(ScanConfig::from_layer(project.over(user)))
}

const DEFAULT_MAX_ACTIONS: usize = 500;

fn default_workspace() -> PathBuf {
    PathBuf::from("repo_scans")
}

fn default_source_base_url() -> String {
    "https://github.com".to_string()
}

fn default_git_program() -> String {
    "git".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let layer = load_project_config(root.path()).expect("load should succeed");
        let cfg = ScanConfig::from_layer(layer);
        assert_eq!(cfg.workspace, PathBuf::from("repo_scans"));
        assert_eq!(cfg.source_base_url, "https://github.com");
        assert_eq!(cfg.git_program, "git");
        assert_eq!(cfg.max_actions, 500);
        assert_eq!(cfg.limits(), ScanLimits::with_max_actions(500));
        assert!(cfg.output.is_none());
    }

    #[test]
    fn project_file_is_parsed() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            root.path().join(PROJECT_CONFIG_FILE),
            "workspace = \"scans\"\nsource_base_url = \"https://git.example.com/\"\nmax_actions = 0\noutput = \"json\"\n",
        )
        .expect("write config");

        let cfg = ScanConfig::from_layer(load_project_config(root.path()).expect("parse"));
        assert_eq!(cfg.workspace, PathBuf::from("scans"));
        assert_eq!(cfg.source_base_url, "https://git.example.com");
        assert_eq!(cfg.limits(), ScanLimits::unlimited());
        assert_eq!(cfg.output.as_deref(), Some("json"));
    }

    #[test]
    fn higher_layer_wins_key_by_key() {
        let project = ConfigLayer {
            workspace: Some(PathBuf::from("mine")),
            ..ConfigLayer::default()
        };
        let user = ConfigLayer {
            workspace: Some(PathBuf::from("theirs")),
            git_program: Some("/usr/local/bin/git".into()),
            ..ConfigLayer::default()
        };

        let merged = project.over(user);
        assert_eq!(merged.workspace, Some(PathBuf::from("mine")));
        assert_eq!(merged.git_program.as_deref(), Some("/usr/local/bin/git"));
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let root = tempfile::tempdir().expect("tempdir");
        let path = root.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "max_actions = \"many\"\n").expect("write config");

        let err = load_layer(&path).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("pinwalk.toml"));
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let root = tempfile::tempdir().expect("tempdir");
        let path = root.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "workspcae = \"typo\"\n").expect("write config");
        assert!(load_layer(&path).is_err());
    }
}
