use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sagegui_core::ProgressReporter;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Terminal progress for uploads (spinner) and archive building (bar).
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.slot();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.slot().take() {
            pb.finish_and_clear();
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(TICK_CHARS);
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

impl ProgressReporter for CliReporter {
    fn on_upload_start(&self, name: &str, bytes: u64) {
        self.set_bar(spinner(format!("Uploading {} ({})", name, human_bytes(bytes))));
    }

    fn on_upload_complete(&self, name: &str, duration_secs: f64) {
        self.finish_bar();
        eprintln!("  {} Uploaded {} in {:.2}s", "✓".green(), name, duration_secs);
    }

    fn on_archive_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        let style = ProgressStyle::with_template(
            "  {spinner:.cyan} Archiving [{bar:30.cyan/dim}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_archive_progress(&self, files_done: usize, _total_files: usize, current_file: &str) {
        if let Some(pb) = self.slot().as_ref() {
            pb.set_position(files_done as u64);
            pb.set_message(current_file.to_string());
        }
    }

    fn on_archive_complete(&self, files: usize, bytes: u64, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Archived {} files ({}) in {:.2}s",
            "✓".green(),
            files,
            human_bytes(bytes),
            duration_secs
        );
    }
}
