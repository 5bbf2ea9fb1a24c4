use ssh2::{ErrorCode, FileStat, Sftp};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{join, RemoteStore};
use crate::connection::{ConnectionContext, SshSession};
use crate::error::{EntityKind, Error, Result};

const LIBSSH2_FX_NO_SUCH_FILE: i32 = 2;
const LIBSSH2_FX_FAILURE: i32 = 4;
const LIBSSH2_FX_NO_SUCH_PATH: i32 = 10;
const LIBSSH2_FX_FILE_ALREADY_EXISTS: i32 = 11;
const DIR_MODE: i32 = 0o755;

/// SFTP-backed store holding one cached session for its whole lifetime.
pub struct SftpStore {
    // Declared before the session so the channel closes first.
    sftp: Sftp,
    session: SshSession,
}

impl SftpStore {
    pub fn connect(ctx: &ConnectionContext) -> Result<Self> {
        let session = ctx.open_session()?;
        let sftp = session.sftp().map_err(|e| {
            Error::Connection(format!("cannot open SFTP channel on {}: {}", ctx.address(), e))
        })?;
        info!("SFTP store connected to {}", ctx.address());
        Ok(Self { sftp, session })
    }

    pub fn session(&self) -> &SshSession {
        &self.session
    }

    fn stat(&self, path: &str) -> Result<Option<FileStat>> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) => Ok(Some(stat)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(Error::io(path, e.into())),
        }
    }

    fn remove_recursive(&self, path: &str) -> Result<()> {
        for (name, is_dir) in self.entries(path)? {
            let child = join(path, &name);
            if is_dir {
                self.remove_recursive(&child)?;
            } else {
                self.sftp
                    .unlink(Path::new(&child))
                    .map_err(|e| map_ssh(&child, e))?;
            }
        }
        self.sftp.rmdir(Path::new(path)).map_err(|e| map_ssh(path, e))
    }

    fn entries(&self, path: &str) -> Result<Vec<(String, bool)>> {
        let listing = self.sftp.readdir(Path::new(path)).map_err(|e| map_ssh(path, e))?;
        let mut entries: Vec<(String, bool)> = listing
            .into_iter()
            .filter_map(|(entry, stat)| {
                let name = entry.file_name()?.to_string_lossy().into_owned();
                if name == "." || name == ".." {
                    return None;
                }
                Some((name, stat.is_dir()))
            })
            .collect();
        entries.sort();
        Ok(entries)
    }
}

fn is_missing(err: &ssh2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::SFTP(LIBSSH2_FX_NO_SUCH_FILE) | ErrorCode::SFTP(LIBSSH2_FX_NO_SUCH_PATH)
    )
}

fn map_ssh(path: &str, err: ssh2::Error) -> Error {
    if is_missing(&err) {
        return Error::not_found(EntityKind::Path, path);
    }
    if let ErrorCode::SFTP(LIBSSH2_FX_FILE_ALREADY_EXISTS) = err.code() {
        return Error::already_exists(EntityKind::Path, path);
    }
    Error::io(path, io::Error::from(err))
}

/// Servers speaking SFTP v3 (OpenSSH among them) answer `mkdir` on an existing
/// path with the generic failure code, so `exists_now` is checked after the fact.
fn map_mkdir(path: &str, err: ssh2::Error, exists_now: bool) -> Error {
    if exists_now && is_generic_failure(&err) {
        return Error::already_exists(EntityKind::Path, path);
    }
    map_ssh(path, err)
}

fn is_generic_failure(err: &ssh2::Error) -> bool {
    matches!(err.code(), ErrorCode::SFTP(LIBSSH2_FX_FAILURE))
}

impl RemoteStore for SftpStore {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.stat(path)?.is_some())
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(self.stat(path)?.map(|stat| stat.is_dir()).unwrap_or(false))
    }

    fn make_dir(&self, path: &str, recreate_ok: bool) -> Result<()> {
        if let Some(stat) = self.stat(path)? {
            if recreate_ok && stat.is_dir() {
                return Ok(());
            }
            return Err(Error::already_exists(EntityKind::Path, path));
        }
        debug!("sftp mkdir {}", path);
        match self.sftp.mkdir(Path::new(path), DIR_MODE) {
            Ok(()) => Ok(()),
            Err(e) => {
                let existing = if is_generic_failure(&e) {
                    self.stat(path)?
                } else {
                    None
                };
                if recreate_ok && existing.as_ref().is_some_and(|stat| stat.is_dir()) {
                    return Ok(());
                }
                Err(map_mkdir(path, e, existing.is_some()))
            }
        }
    }

    fn remove_tree(&self, path: &str) -> Result<()> {
        if self.stat(path)?.is_none() {
            return Err(Error::not_found(EntityKind::Path, path));
        }
        debug!("sftp rm -r {}", path);
        self.remove_recursive(path)
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        debug!("sftp rm {}", path);
        self.sftp.unlink(Path::new(path)).map_err(|e| map_ssh(path, e))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.entries(path)?.into_iter().map(|(name, _)| name).collect())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.sftp.open(Path::new(path)).map_err(|e| map_ssh(path, e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| Error::io(path, e))?;
        debug!("sftp read {} ({} bytes)", path, data.len());
        Ok(data)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        debug!("sftp write {} ({} bytes)", path, data.len());
        let mut file = self.sftp.create(Path::new(path)).map_err(|e| map_ssh(path, e))?;
        file.write_all(data).map_err(|e| Error::io(path, e))?;
        file.flush().map_err(|e| Error::io(path, e))
    }
}
