use std::fmt::Write;

use super::command::{shell_quote, CommandLine};
use crate::config::SchedulerConfig;

/// Render the batch script: shebang, scheduler directives, `cd`, invocation.
pub fn render_job_script(
    scheduler: &SchedulerConfig,
    project_dir: &str,
    command: &CommandLine,
) -> String {
    let prefix = scheduler.directive_prefix.as_str();
    let mut script = String::from("#!/bin/sh\n");
    // Writing to a String cannot fail.
    let _ = writeln!(script, "{} --nodes={}", prefix, scheduler.nodes);
    let _ = writeln!(script, "{} --ntasks={}", prefix, scheduler.ntasks);
    let _ = writeln!(script, "{} --cpus-per-task={}", prefix, scheduler.cpus_per_task);
    let _ = writeln!(script, "{} --mem={}", prefix, scheduler.memory);
    let _ = writeln!(script, "{} --partition={}", prefix, scheduler.partition);
    let _ = writeln!(script, "{} --time={}", prefix, scheduler.time_limit);
    for directive in &scheduler.extra_directives {
        let _ = writeln!(script, "{} {}", prefix, directive.trim());
    }
    script.push('\n');
    let _ = writeln!(script, "cd {}", shell_quote(project_dir));
    script.push('\n');
    script.push_str(&command.render());
    script.push('\n');
    normalize_line_endings(&script)
}

/// Convert CRLF and lone CR to LF.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
