use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::debug;

use super::RemoteStore;
use crate::error::{EntityKind, Error, Result};

/// std::fs backed store for tests and for running against a mounted file system.
#[derive(Debug, Default, Clone)]
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        LocalStore
    }
}

fn map_io(path: &str, err: io::Error) -> Error {
    match err.kind() {
        ErrorKind::NotFound => Error::not_found(EntityKind::Path, path),
        ErrorKind::AlreadyExists => Error::already_exists(EntityKind::Path, path),
        _ => Error::io(path, err),
    }
}

impl RemoteStore for LocalStore {
    fn exists(&self, path: &str) -> Result<bool> {
        Path::new(path).try_exists().map_err(|e| Error::io(path, e))
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn make_dir(&self, path: &str, recreate_ok: bool) -> Result<()> {
        if self.exists(path)? {
            if recreate_ok && self.is_dir(path)? {
                return Ok(());
            }
            return Err(Error::already_exists(EntityKind::Path, path));
        }
        debug!("mkdir {}", path);
        fs::create_dir(path).map_err(|e| map_io(path, e))
    }

    fn remove_tree(&self, path: &str) -> Result<()> {
        if !self.exists(path)? {
            return Err(Error::not_found(EntityKind::Path, path));
        }
        debug!("rm -r {}", path);
        fs::remove_dir_all(path).map_err(|e| map_io(path, e))
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        debug!("rm {}", path);
        fs::remove_file(path).map_err(|e| map_io(path, e))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let entries = fs::read_dir(path).map_err(|e| map_io(path, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| map_io(path, e))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        debug!("write {} ({} bytes)", path, data.len());
        fs::write(path, data).map_err(|e| map_io(path, e))
    }
}
