/// Trait for reporting transfer progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_upload_start(&self, _name: &str, _bytes: u64) {}
    fn on_upload_complete(&self, _name: &str, _duration_secs: f64) {}
    fn on_archive_start(&self, _total_files: usize) {}
    fn on_archive_progress(&self, _files_done: usize, _total_files: usize, _current_file: &str) {}
    fn on_archive_complete(&self, _files: usize, _bytes: u64, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
