//! Hands job scripts to the batch scheduler.

pub mod local;
pub mod ssh;

pub use local::LocalJobSubmitter;
pub use ssh::SshJobSubmitter;

use crate::compiler::command::shell_quote;
use crate::error::Result;

const SUBMITTED_PREFIX: &str = "Submitted batch job ";

pub trait JobSubmitter {
    /// Mark `script_path` executable and enqueue it.
    fn submit(&self, script_path: &str) -> Result<SubmissionReceipt>;
}

/// What one remote command printed, with its exit status when the transport reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<i32>,
}

impl CommandOutput {
    pub fn failed(&self) -> bool {
        matches!(self.exit_status, Some(status) if status != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub script_path: String,
    pub stdout: String,
    /// Raw scheduler diagnostics, shown to the user as-is.
    pub stderr: String,
    pub exit_status: Option<i32>,
}

impl SubmissionReceipt {
    pub fn from_output(script_path: &str, output: CommandOutput) -> Self {
        Self {
            script_path: script_path.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_status: output.exit_status,
        }
    }

    /// True unless the scheduler reported a non-zero exit status.
    pub fn succeeded(&self) -> bool {
        !matches!(self.exit_status, Some(status) if status != 0)
    }

    /// Job id parsed from `Submitted batch job <id>`.
    pub fn job_id(&self) -> Option<&str> {
        self.stdout.lines().find_map(|line| {
            let id = line.trim().strip_prefix(SUBMITTED_PREFIX)?.trim();
            id.split_whitespace().next()
        })
    }
}

pub(crate) fn chmod_command(script_path: &str) -> String {
    format!("chmod +x {}", shell_quote(script_path))
}

pub(crate) fn submit_command(submit: &str, script_path: &str) -> String {
    format!("{} {}", submit, shell_quote(script_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(stdout: &str, status: Option<i32>) -> SubmissionReceipt {
        SubmissionReceipt::from_output(
            "/ws/s.sh",
            CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_status: status,
            },
        )
    }

    #[test]
    fn test_job_id_parsed_from_sbatch_output() {
        assert_eq!(receipt("Submitted batch job 48213\n", Some(0)).job_id(), Some("48213"));
        assert_eq!(receipt("queued\n", Some(0)).job_id(), None);
    }

    #[test]
    fn test_exit_status_decides_success() {
        assert!(receipt("", Some(0)).succeeded());
        assert!(receipt("", None).succeeded());
        assert!(!receipt("", Some(1)).succeeded());
    }

    #[test]
    fn test_commands_quote_paths() {
        assert_eq!(chmod_command("/ws/a b.sh"), "chmod +x '/ws/a b.sh'");
        assert_eq!(submit_command("sbatch", "/ws/s.sh"), "sbatch /ws/s.sh");
    }
}
