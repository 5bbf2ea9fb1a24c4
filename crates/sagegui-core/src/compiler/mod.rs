//! Parameter compilers: structured search configuration in, job script out.
//!
//! Compilation is pure. The same parameters and resolved paths always give
//! byte-identical output, and nothing here touches the store.

pub mod command;
pub mod diann;
pub mod mods;
pub mod sage;
pub mod script;

pub use command::CommandLine;
pub use diann::{DiannCompiler, DiannParameters};
pub use sage::{SageCompiler, SageParameters};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::config::SearchTool;
use crate::error::{Error, Result};
use crate::workspace::ResourceSchema;

/// Bare file names a parameter set refers to, per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReferences {
    pub inputs: Vec<String>,
    pub libraries: Vec<String>,
}

/// Absolute remote paths handed to a compiler. `inputs` and `libraries`
/// line up with [`FileReferences`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub project_dir: String,
    pub search_dir: String,
    pub inputs: Vec<String>,
    pub libraries: Vec<String>,
}

/// Extra file a compiler wants written next to the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionFile {
    pub name: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSearch {
    pub command: CommandLine,
    pub script: String,
    pub companions: Vec<CompanionFile>,
}

pub trait SearchParameters: Debug + Clone + Default + Serialize + DeserializeOwned {
    fn references(&self) -> FileReferences;

    fn set_references(&mut self, references: FileReferences) -> Result<()>;

    /// Checked before anything is written for a search.
    fn validate(&self) -> Result<()>;
}

/// One strategy per supported search tool.
pub trait SearchCompiler {
    type Params: SearchParameters;

    fn tool(&self) -> SearchTool;

    fn schema(&self) -> ResourceSchema;

    fn compile(&self, params: &Self::Params, paths: &ResolvedPaths) -> Result<CompiledSearch>;
}

pub(crate) fn require_absolute(label: &str, paths: &[String]) -> Result<()> {
    match paths.iter().find(|p| !p.starts_with('/')) {
        Some(path) => Err(Error::Validation(format!(
            "{} path '{}' is not absolute",
            label, path
        ))),
        None => Ok(()),
    }
}

pub(crate) fn check_resolved(references: &FileReferences, paths: &ResolvedPaths) -> Result<()> {
    if references.inputs.len() != paths.inputs.len()
        || references.libraries.len() != paths.libraries.len()
    {
        return Err(Error::Validation(
            "resolved paths do not match the parameter file references".to_string(),
        ));
    }
    require_absolute("input", &paths.inputs)?;
    require_absolute("library", &paths.libraries)?;
    require_absolute("project", std::slice::from_ref(&paths.project_dir))?;
    require_absolute("search", std::slice::from_ref(&paths.search_dir))
}
