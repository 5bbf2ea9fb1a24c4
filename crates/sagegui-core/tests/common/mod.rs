#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use sagegui_core::compiler::{DiannCompiler, SageCompiler, SearchCompiler};
use sagegui_core::config::SchedulerConfig;
use sagegui_core::store::LocalStore;
use sagegui_core::submit::{JobSubmitter, SubmissionReceipt};
use sagegui_core::WorkspaceManager;

/// Records every script path instead of talking to a scheduler.
pub struct RecordingSubmitter {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub exit_status: Option<i32>,
    pub stderr: String,
}

impl JobSubmitter for RecordingSubmitter {
    fn submit(&self, script_path: &str) -> sagegui_core::Result<SubmissionReceipt> {
        self.calls.lock().unwrap().push(script_path.to_string());
        Ok(SubmissionReceipt {
            script_path: script_path.to_string(),
            stdout: "Submitted batch job 1001\n".to_string(),
            stderr: self.stderr.clone(),
            exit_status: self.exit_status,
        })
    }
}

pub fn root_str(root: &Path) -> String {
    root.to_str().unwrap().to_string()
}

pub fn open_with<C: SearchCompiler>(
    root: &Path,
    compiler: C,
    exit_status: Option<i32>,
    stderr: &str,
) -> (WorkspaceManager<C>, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let submitter = RecordingSubmitter {
        calls: Arc::clone(&calls),
        exit_status,
        stderr: stderr.to_string(),
    };
    let manager = WorkspaceManager::open(
        Box::new(LocalStore::new()),
        Box::new(submitter),
        compiler,
        &root_str(root),
    )
    .unwrap();
    (manager, calls)
}

pub fn diann_workspace(root: &Path) -> (WorkspaceManager<DiannCompiler>, Arc<Mutex<Vec<String>>>) {
    open_with(
        root,
        DiannCompiler::new("/opt/DiaNN.sif", SchedulerConfig::default()),
        Some(0),
        "",
    )
}

pub fn sage_workspace(root: &Path) -> (WorkspaceManager<SageCompiler>, Arc<Mutex<Vec<String>>>) {
    open_with(
        root,
        SageCompiler::new("sage", SchedulerConfig::default()),
        Some(0),
        "",
    )
}
