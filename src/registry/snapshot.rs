use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::reference::{BuildResult, SourceHead};

use super::RegistryError;

/// Serialized state of the projects, branch jobs and builds of a CI host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    #[serde(default)]
    pub projects: Vec<ProjectSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectSnapshot {
    pub name: String,

    #[serde(default)]
    pub kind: ProjectKind,

    /// Jobs keyed by branch name, in discovery order
    #[serde(default)]
    pub jobs: IndexMap<String, JobSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    /// One job per source-control branch
    #[default]
    MultiBranch,
    /// Plain folder of unrelated jobs
    Folder,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSnapshot {
    /// Source-control head the job builds; plain branch when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<SourceHead>,

    #[serde(default)]
    pub builds: Vec<BuildSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSnapshot {
    pub number: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BuildResult>,

    #[serde(default)]
    pub building: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl BuildSnapshot {
    pub fn is_completed(&self) -> bool {
        !self.building && self.result.is_some()
    }
}

impl Snapshot {
    /// Loads a snapshot, choosing the format by file extension.
    ///
    /// Files without a known extension are tried as TOML, then JSON, then YAML.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| RegistryError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let snapshot: Self = match extension(path) {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
            "json" => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?
            }
            _ => toml::from_str::<Self>(&contents)
                .ok()
                .or_else(|| serde_json::from_str(&contents).ok())
                .or_else(|| serde_yaml::from_str(&contents).ok())
                .ok_or_else(|| parse_error("not a TOML, JSON or YAML snapshot".to_string()))?,
        };

        debug!(
            "Loaded snapshot with {} projects from: {}",
            snapshot.projects.len(),
            path.display()
        );

        Ok(snapshot)
    }

    /// Saves the snapshot, choosing the format by file extension (TOML by default).
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let write_error = |message: String| RegistryError::Write {
            path: path.to_path_buf(),
            message,
        };

        let contents = match extension(path) {
            "json" => serde_json::to_string_pretty(self).map_err(|e| write_error(e.to_string()))?,
            "yaml" | "yml" => serde_yaml::to_string(self).map_err(|e| write_error(e.to_string()))?,
            _ => toml::to_string_pretty(self).map_err(|e| write_error(e.to_string()))?,
        };

        fs::write(path, contents).map_err(|e| write_error(e.to_string()))?;
        debug!("Saved snapshot to: {}", path.display());

        Ok(())
    }

    pub fn project(&self, name: &str) -> Option<&ProjectSnapshot> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Splits `<project>/<branch>` into its parts.
    ///
    /// Project names may contain slashes themselves, so the longest matching
    /// project name wins.
    pub(super) fn locate(&self, full_name: &str) -> Option<(usize, String)> {
        self.projects
            .iter()
            .enumerate()
            .filter_map(|(index, project)| {
                full_name
                    .strip_prefix(project.name.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .filter(|branch| project.jobs.contains_key(*branch))
                    .map(|branch| (index, project.name.len(), branch.to_string()))
            })
            .max_by_key(|(_, len, _)| *len)
            .map(|(index, _, branch)| (index, branch))
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}
