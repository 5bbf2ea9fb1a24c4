use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource collections a caller can upload into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Input,
    Library,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Input => f.write_str("input"),
            ResourceKind::Library => f.write_str("library"),
        }
    }
}

/// Directory names making up one project, which differ per search tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    pub inputs: String,
    pub libraries: String,
    pub searches: String,
    pub script_name: String,
}

impl ResourceSchema {
    /// Raw runs in `data`, spectral libraries in `spec_lib`.
    pub fn diann() -> Self {
        Self {
            inputs: "data".to_string(),
            libraries: "spec_lib".to_string(),
            searches: "search".to_string(),
            script_name: "search_command.sh".to_string(),
        }
    }

    /// mzML runs in `data`, protein databases in `fasta`.
    pub fn sage() -> Self {
        Self {
            inputs: "data".to_string(),
            libraries: "fasta".to_string(),
            searches: "search".to_string(),
            script_name: "search_command.sh".to_string(),
        }
    }

    pub fn collection(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::Input => self.inputs.as_str(),
            ResourceKind::Library => self.libraries.as_str(),
        }
    }

    /// Every sub-directory created with a project.
    pub fn collections(&self) -> [&str; 3] {
        [
            self.inputs.as_str(),
            self.searches.as_str(),
            self.libraries.as_str(),
        ]
    }
}
