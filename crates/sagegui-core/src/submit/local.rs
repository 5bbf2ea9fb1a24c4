use std::process::Command;
use tracing::{debug, info};

use super::{chmod_command, submit_command, CommandOutput, JobSubmitter, SubmissionReceipt};
use crate::error::{Error, Result};

/// Runs the scheduler on this machine through `sh -c`.
pub struct LocalJobSubmitter {
    submit: String,
}

impl LocalJobSubmitter {
    pub fn new(submit: impl Into<String>) -> Self {
        Self {
            submit: submit.into(),
        }
    }
}

fn run(command: &str) -> Result<CommandOutput> {
    debug!("sh -c {}", command);
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| Error::Connection(format!("cannot spawn shell for '{}': {}", command, e)))?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_status: output.status.code(),
    })
}

impl JobSubmitter for LocalJobSubmitter {
    fn submit(&self, script_path: &str) -> Result<SubmissionReceipt> {
        let chmod = run(&chmod_command(script_path))?;
        if chmod.failed() {
            return Ok(SubmissionReceipt::from_output(script_path, chmod));
        }
        let output = run(&submit_command(&self.submit, script_path))?;
        info!("Submitted {} locally (status {:?})", script_path, output.exit_status);
        Ok(SubmissionReceipt::from_output(script_path, output))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_runs_script_with_configured_command() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("job.sh");
        fs::write(&script, "#!/bin/sh\necho Submitted batch job 7\necho warn >&2\n").unwrap();

        let receipt = LocalJobSubmitter::new("sh")
            .submit(script.to_str().unwrap())
            .unwrap();
        assert_eq!(receipt.exit_status, Some(0));
        assert_eq!(receipt.job_id(), Some("7"));
        assert_eq!(receipt.stderr.trim(), "warn");
    }

    #[test]
    fn test_missing_script_reports_chmod_failure() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.sh");
        let receipt = LocalJobSubmitter::new("sh")
            .submit(missing.to_str().unwrap())
            .unwrap();
        assert!(!receipt.succeeded());
        assert!(!receipt.stderr.is_empty());
    }
}
