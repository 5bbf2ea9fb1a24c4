use super::schema::{ResourceKind, ResourceSchema};
use crate::store::join;

pub const PROJECTS_DIR: &str = "projects";

/// Maps domain entities to absolute store paths:
/// `<root>/projects/<project>/<collection>/<name>`.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: String,
    schema: ResourceSchema,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<String>, schema: ResourceSchema) -> Self {
        Self {
            root: root.into(),
            schema,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub fn projects_dir(&self) -> String {
        join(&self.root, PROJECTS_DIR)
    }

    pub fn project_dir(&self, project: &str) -> String {
        join(&self.projects_dir(), project)
    }

    pub fn collection_dir(&self, project: &str, kind: ResourceKind) -> String {
        join(&self.project_dir(project), self.schema.collection(kind))
    }

    pub fn resource_path(&self, project: &str, kind: ResourceKind, file_name: &str) -> String {
        join(&self.collection_dir(project, kind), file_name)
    }

    pub fn searches_dir(&self, project: &str) -> String {
        join(&self.project_dir(project), &self.schema.searches)
    }

    pub fn search_dir(&self, project: &str, search: &str) -> String {
        join(&self.searches_dir(project), search)
    }

    pub fn search_file(&self, project: &str, search: &str, file_name: &str) -> String {
        join(&self.search_dir(project, search), file_name)
    }

    pub fn script_path(&self, project: &str, search: &str) -> String {
        self.search_file(project, search, &self.schema.script_name)
    }
}
