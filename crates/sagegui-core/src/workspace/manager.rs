use std::time::Instant;
use tracing::{debug, info, warn};

use super::layout::WorkspaceLayout;
use super::naming::validate_name;
use super::schema::ResourceKind;
use crate::archive::ArchiveBuilder;
use crate::compiler::script::normalize_line_endings;
use crate::compiler::{CompiledSearch, ResolvedPaths, SearchCompiler, SearchParameters};
use crate::error::{EntityKind, Error, Result};
use crate::progress::{ProgressReporter, SilentReporter};
use crate::results::{parse_tsv, ResultTable};
use crate::store::{join, RemoteStore};
use crate::submit::{JobSubmitter, SubmissionReceipt};

/// A search written to the store but not yet submitted.
#[derive(Debug, Clone)]
pub struct CreatedSearch {
    pub script_path: String,
    pub compiled: CompiledSearch,
}

pub struct WorkspaceManager<C: SearchCompiler> {
    store: Box<dyn RemoteStore>,
    submitter: Box<dyn JobSubmitter>,
    compiler: C,
    layout: WorkspaceLayout,
    reporter: Box<dyn ProgressReporter>,
}

fn qualified(project: &str, name: &str) -> String {
    format!("{}/{}", project, name)
}

impl<C: SearchCompiler> WorkspaceManager<C> {
    /// Open the workspace at `root`, creating `<root>/projects` when missing.
    ///
    /// `root` must be absolute: job scripts refer to every file by full path.
    pub fn open(
        store: Box<dyn RemoteStore>,
        submitter: Box<dyn JobSubmitter>,
        compiler: C,
        root: &str,
    ) -> Result<Self> {
        if !root.starts_with('/') {
            return Err(Error::Validation(format!(
                "workspace root '{}' is not an absolute path",
                root
            )));
        }
        let layout = WorkspaceLayout::new(root, compiler.schema());
        store.make_dir(&layout.projects_dir(), true)?;
        debug!("Workspace opened at {}", layout.projects_dir());
        Ok(Self {
            store,
            submitter,
            compiler,
            layout,
            reporter: Box::new(SilentReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    // ---- projects ----

    pub fn create_project(&self, name: &str) -> Result<()> {
        validate_name(EntityKind::Project, name)?;
        let project_dir = self.layout.project_dir(name);
        if self.store.exists(&project_dir)? {
            return Err(Error::already_exists(EntityKind::Project, name));
        }

        self.store.make_dir(&project_dir, false)?;
        for collection in self.layout.schema().collections() {
            self.store
                .make_dir(&join(&project_dir, collection), false)?;
        }
        info!("Created project '{}'", name);
        Ok(())
    }

    pub fn remove_project(&self, name: &str) -> Result<()> {
        validate_name(EntityKind::Project, name)?;
        self.require_project(name)?;
        self.store.remove_tree(&self.layout.project_dir(name))?;
        info!("Removed project '{}'", name);
        Ok(())
    }

    pub fn list_projects(&self) -> Result<Vec<String>> {
        self.store.list_dir(&self.layout.projects_dir())
    }

    fn require_project(&self, project: &str) -> Result<()> {
        validate_name(EntityKind::Project, project)?;
        if !self.store.exists(&self.layout.project_dir(project))? {
            return Err(Error::not_found(EntityKind::Project, project));
        }
        Ok(())
    }

    // ---- resources ----

    fn require_collection(&self, project: &str, kind: ResourceKind) -> Result<String> {
        self.require_project(project)?;
        let dir = self.layout.collection_dir(project, kind);
        if !self.store.exists(&dir)? {
            return Err(Error::not_found(
                EntityKind::Collection,
                qualified(project, self.layout.schema().collection(kind)),
            ));
        }
        Ok(dir)
    }

    fn require_resource(
        &self,
        project: &str,
        kind: ResourceKind,
        file_name: &str,
    ) -> Result<String> {
        validate_name(EntityKind::Resource, file_name)?;
        self.require_collection(project, kind)?;
        let path = self.layout.resource_path(project, kind, file_name);
        if !self.store.exists(&path)? {
            return Err(Error::not_found(
                EntityKind::Resource,
                format!(
                    "{}/{}/{}",
                    project,
                    self.layout.schema().collection(kind),
                    file_name
                ),
            ));
        }
        Ok(path)
    }

    /// Upload a resource. An existing file of the same name is replaced.
    pub fn add_resource(
        &self,
        project: &str,
        kind: ResourceKind,
        file_name: &str,
        data: &[u8],
    ) -> Result<()> {
        validate_name(EntityKind::Resource, file_name)?;
        self.require_collection(project, kind)?;
        let path = self.layout.resource_path(project, kind, file_name);
        if self.store.exists(&path)? {
            warn!("Replacing existing {} file '{}' in project '{}'", kind, file_name, project);
        }

        let start = Instant::now();
        self.reporter.on_upload_start(file_name, data.len() as u64);
        self.store.write_file(&path, data)?;
        self.reporter
            .on_upload_complete(file_name, start.elapsed().as_secs_f64());
        info!(
            "Added {} file '{}' ({} bytes) to project '{}'",
            kind,
            file_name,
            data.len(),
            project
        );
        Ok(())
    }

    pub fn remove_resource(
        &self,
        project: &str,
        kind: ResourceKind,
        file_name: &str,
    ) -> Result<()> {
        let path = self.require_resource(project, kind, file_name)?;
        self.store.remove_file(&path)?;
        info!("Removed {} file '{}' from project '{}'", kind, file_name, project);
        Ok(())
    }

    pub fn list_resources(&self, project: &str, kind: ResourceKind) -> Result<Vec<String>> {
        let dir = self.require_collection(project, kind)?;
        self.store.list_dir(&dir)
    }

    pub fn fetch_resource(
        &self,
        project: &str,
        kind: ResourceKind,
        file_name: &str,
    ) -> Result<Vec<u8>> {
        let path = self.require_resource(project, kind, file_name)?;
        self.store.read_file(&path)
    }

    // ---- searches ----

    fn require_search(&self, project: &str, search: &str) -> Result<String> {
        validate_name(EntityKind::Search, search)?;
        self.require_project(project)?;
        let dir = self.layout.search_dir(project, search);
        if !self.store.exists(&dir)? {
            return Err(Error::not_found(EntityKind::Search, qualified(project, search)));
        }
        Ok(dir)
    }

    /// Compile `params` and write the job script. Does not submit.
    ///
    /// Validation and every existence check run before the search directory
    /// is created, so a rejected configuration leaves the store untouched.
    pub fn create_search(
        &self,
        project: &str,
        search: &str,
        params: &C::Params,
    ) -> Result<CreatedSearch> {
        validate_name(EntityKind::Project, project)?;
        validate_name(EntityKind::Search, search)?;
        params.validate()?;

        self.require_project(project)?;
        let searches_dir = self.layout.searches_dir(project);
        if !self.store.exists(&searches_dir)? {
            return Err(Error::not_found(
                EntityKind::Collection,
                qualified(project, &self.layout.schema().searches),
            ));
        }
        let search_dir = self.layout.search_dir(project, search);
        if self.store.exists(&search_dir)? {
            return Err(Error::already_exists(EntityKind::Search, qualified(project, search)));
        }

        let references = params.references();
        let paths = ResolvedPaths {
            project_dir: self.layout.project_dir(project),
            search_dir: search_dir.clone(),
            inputs: self.resolve_all(project, ResourceKind::Input, &references.inputs)?,
            libraries: self.resolve_all(project, ResourceKind::Library, &references.libraries)?,
        };
        let compiled = self.compiler.compile(params, &paths)?;

        self.store.make_dir(&search_dir, false)?;
        for companion in &compiled.companions {
            let path = self.layout.search_file(project, search, &companion.name);
            self.store
                .write_file(&path, normalize_line_endings(&companion.contents).as_bytes())?;
        }
        let script_path = self.layout.script_path(project, search);
        self.store
            .write_file(&script_path, normalize_line_endings(&compiled.script).as_bytes())?;

        info!(
            "Created {:?} search '{}' in project '{}' ({} inputs)",
            self.compiler.tool(),
            search,
            project,
            paths.inputs.len()
        );
        Ok(CreatedSearch {
            script_path,
            compiled,
        })
    }

    fn resolve_all(
        &self,
        project: &str,
        kind: ResourceKind,
        names: &[String],
    ) -> Result<Vec<String>> {
        names
            .iter()
            .map(|name| self.require_resource(project, kind, name))
            .collect()
    }

    /// Hand the search's script to the scheduler.
    ///
    /// A non-empty diagnostic stream is returned in the receipt. Only a known
    /// non-zero exit status is an error.
    pub fn submit_search(&self, project: &str, search: &str) -> Result<SubmissionReceipt> {
        self.require_search(project, search)?;
        let script_path = self.layout.script_path(project, search);
        if !self.store.exists(&script_path)? {
            return Err(Error::not_found(
                EntityKind::Resource,
                format!("{}/{}", qualified(project, search), self.layout.schema().script_name),
            ));
        }

        let receipt = self.submitter.submit(&script_path)?;
        if let Some(status) = receipt.exit_status.filter(|status| *status != 0) {
            return Err(Error::Submission {
                script: script_path,
                status,
                stderr: receipt.stderr.trim().to_string(),
            });
        }
        if !receipt.stderr.trim().is_empty() {
            warn!(
                "Scheduler diagnostics for '{}': {}",
                qualified(project, search),
                receipt.stderr.trim()
            );
        }
        info!(
            "Submitted search '{}' (job {})",
            qualified(project, search),
            receipt.job_id().unwrap_or("unknown")
        );
        Ok(receipt)
    }

    pub fn remove_search(&self, project: &str, search: &str) -> Result<()> {
        let dir = self.require_search(project, search)?;
        self.store.remove_tree(&dir)?;
        info!("Removed search '{}'", qualified(project, search));
        Ok(())
    }

    pub fn list_searches(&self, project: &str) -> Result<Vec<String>> {
        self.require_project(project)?;
        let dir = self.layout.searches_dir(project);
        if !self.store.exists(&dir)? {
            return Err(Error::not_found(
                EntityKind::Collection,
                qualified(project, &self.layout.schema().searches),
            ));
        }
        self.store.list_dir(&dir)
    }

    pub fn list_result_files(&self, project: &str, search: &str) -> Result<Vec<String>> {
        let dir = self.require_search(project, search)?;
        self.store.list_dir(&dir)
    }

    pub fn fetch_result_file(
        &self,
        project: &str,
        search: &str,
        file_name: &str,
    ) -> Result<ResultTable> {
        validate_name(EntityKind::Resource, file_name)?;
        self.require_search(project, search)?;
        let path = self.layout.search_file(project, search, file_name);
        if !self.store.exists(&path)? {
            return Err(Error::not_found(
                EntityKind::Resource,
                format!("{}/{}", qualified(project, search), file_name),
            ));
        }
        parse_tsv(&self.store.read_file(&path)?)
    }

    /// Zip every file directly inside the search directory under its bare name.
    /// Sub-directories are skipped, so files in nested directories are not included.
    /// Files are read one after another into memory.
    pub fn fetch_results_archive(&self, project: &str, search: &str) -> Result<Vec<u8>> {
        let dir = self.require_search(project, search)?;
        let mut files = Vec::new();
        for name in self.store.list_dir(&dir)? {
            let path = join(&dir, &name);
            if self.store.is_dir(&path)? {
                debug!("Skipping sub-directory {} in results archive", path);
                continue;
            }
            files.push((name, path));
        }

        let start = Instant::now();
        self.reporter.on_archive_start(files.len());
        let mut builder = ArchiveBuilder::new();
        let mut total_bytes = 0u64;
        for (index, (name, path)) in files.iter().enumerate() {
            let data = self.store.read_file(path)?;
            total_bytes += data.len() as u64;
            builder.add(name, &data)?;
            self.reporter.on_archive_progress(index + 1, files.len(), name);
        }
        let entries = builder.entries();
        let archive = builder.finish()?;
        self.reporter
            .on_archive_complete(entries, total_bytes, start.elapsed().as_secs_f64());
        info!(
            "Archived {} files ({} bytes) from search '{}'",
            entries,
            total_bytes,
            qualified(project, search)
        );
        Ok(archive)
    }
}
