//! Project configuration: a YAML mapping of project name to base URL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// One web application to crawl. Loaded once, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub base_url: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Project '{project}' has invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        project: String,
        url: String,
        reason: String,
    },

    #[error("Config defines no projects")]
    NoProjects,
}

/// Load and validate the project map. Any problem here is fatal before a
/// single page is crawled. Projects come back sorted by name so runs are
/// deterministic.
pub fn load_projects(path: &Path) -> Result<Vec<Project>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let map: BTreeMap<String, String> = serde_yaml::from_str(&text)?;
    if map.is_empty() {
        return Err(ConfigError::NoProjects);
    }

    let mut projects = Vec::with_capacity(map.len());
    for (name, base_url) in map {
        Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            project: name.clone(),
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        projects.push(Project { name, base_url });
    }

    Ok(projects)
}
