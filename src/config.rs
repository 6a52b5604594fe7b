use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::reference::{BuildResult, PolicyKind};

/// Configuration file structure for refbuild.
///
/// Lets pipeline authors keep the target branch, the reference policy and
/// GitLab connection settings next to their project instead of repeating
/// them on every invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Reference resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Default GitLab configuration
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Branch to compare against; empty means detect from merge requests
    #[serde(default)]
    pub target_branch: String,

    /// Policy deciding whether a candidate is acceptable
    #[serde(default)]
    pub policy: PolicyKind,

    /// Worst acceptable result for the `required-result` policy
    #[serde(default = "default_required_result")]
    pub required_result: BuildResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab personal access token
    pub token: Option<String>,

    /// GitLab instance base URL
    #[serde(default = "default_gitlab_base_url")]
    pub base_url: String,

    /// GitLab project path (e.g., 'group/project')
    pub project_path: Option<String>,

    /// Maximum number of pipelines to import
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            target_branch: String::new(),
            policy: PolicyKind::default(),
            required_result: default_required_result(),
        }
    }
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_gitlab_base_url(),
            project_path: None,
            limit: default_limit(),
        }
    }
}

fn default_required_result() -> BuildResult {
    BuildResult::Unstable
}

fn default_gitlab_base_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_limit() -> usize {
    100
}

const CANDIDATES: [&str; 4] = [
    "refbuild.toml",
    "refbuild.json",
    "refbuild.yaml",
    "refbuild.yml",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./refbuild.toml
    /// 3. ./refbuild.json
    /// 4. ./refbuild.yaml
    /// 5. ./refbuild.yml
    /// 6. `<user config dir>/refbuild/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        Self::load_from_candidates(Path::new("."), user_config_file())
    }

    fn load_from_candidates(dir: &Path, user_file: Option<PathBuf>) -> Result<Self> {
        let found = CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .chain(user_file)
            .find(|path| path.exists());

        match found {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("refbuild").join("config.toml"))
}
