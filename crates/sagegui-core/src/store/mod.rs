//! Byte/directory substrate the workspace is built on.
//!
//! Paths are absolute POSIX strings. No operation is atomic across paths and
//! every call may block on a network round trip.

pub mod local;
pub mod sftp;

pub use local::LocalStore;
pub use sftp::SftpStore;

use crate::error::Result;

pub trait RemoteStore {
    fn exists(&self, path: &str) -> Result<bool>;

    fn is_dir(&self, path: &str) -> Result<bool>;

    /// Create a single directory. Fails with `AlreadyExists` unless `recreate_ok`.
    fn make_dir(&self, path: &str, recreate_ok: bool) -> Result<()>;

    /// Recursively delete a directory. Fails with `NotFound` if absent.
    fn remove_tree(&self, path: &str) -> Result<()>;

    fn remove_file(&self, path: &str) -> Result<()>;

    /// Entry names (not paths) of a directory, sorted.
    fn list_dir(&self, path: &str) -> Result<Vec<String>>;

    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Write the whole file, replacing any previous content.
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

impl<T: RemoteStore + ?Sized> RemoteStore for Box<T> {
    fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        (**self).is_dir(path)
    }

    fn make_dir(&self, path: &str, recreate_ok: bool) -> Result<()> {
        (**self).make_dir(path, recreate_ok)
    }

    fn remove_tree(&self, path: &str) -> Result<()> {
        (**self).remove_tree(path)
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        (**self).remove_file(path)
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        (**self).list_dir(path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        (**self).write_file(path, data)
    }
}

/// Join two remote path fragments with exactly one `/` between them.
pub fn join(base: &str, child: &str) -> String {
    let child = child.trim_start_matches('/');
    if base.is_empty() {
        return child.to_string();
    }
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        format!("/{}", child)
    } else {
        format!("{}/{}", base, child)
    }
}
