//! Explicit SSH connection context shared by the SFTP store and the job submitter.
//!
//! Each `SshSession` owns one authenticated transport and disconnects when dropped,
//! so callers never hold credentials in global state.

use ssh2::Session;
use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::ops::Deref;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct ConnectionContext {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

// Keep the password out of logs.
impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ConnectionContext {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open and authenticate a fresh session.
    pub fn open_session(&self) -> Result<SshSession> {
        SshSession::connect(self)
    }
}

/// Authenticated SSH session, disconnected on drop.
pub struct SshSession {
    session: Session,
    address: String,
}

impl SshSession {
    pub fn connect(ctx: &ConnectionContext) -> Result<Self> {
        let address = ctx.address();
        let socket_addr = (ctx.host.as_str(), ctx.port)
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("cannot resolve {}: {}", address, e)))?
            .next()
            .ok_or_else(|| Error::Connection(format!("no address found for {}", address)))?;

        let tcp = TcpStream::connect_timeout(&socket_addr, ctx.timeout)
            .map_err(|e| Error::Connection(format!("cannot reach {}: {}", address, e)))?;
        tcp.set_read_timeout(Some(ctx.timeout))
            .and_then(|_| tcp.set_write_timeout(Some(ctx.timeout)))
            .map_err(|e| {
                Error::Connection(format!("cannot configure socket for {}: {}", address, e))
            })?;

        let mut session = Session::new()
            .map_err(|e| Error::Connection(format!("cannot create session: {}", e)))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout_millis(ctx.timeout));
        session
            .handshake()
            .map_err(|e| Error::Connection(format!("handshake with {} failed: {}", address, e)))?;
        session
            .userauth_password(&ctx.username, &ctx.password)
            .map_err(|e| {
                Error::Connection(format!(
                    "authentication as '{}' on {} failed: {}",
                    ctx.username, address, e
                ))
            })?;
        if !session.authenticated() {
            return Err(Error::Connection(format!(
                "authentication as '{}' on {} was rejected",
                ctx.username, address
            )));
        }

        debug!("SSH session established to {}", address);
        Ok(Self { session, address })
    }
}

impl Deref for SshSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "closing", None) {
            warn!("Failed to disconnect from {}: {}", self.address, e);
        } else {
            debug!("SSH session to {} closed", self.address);
        }
    }
}

fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let ctx = ConnectionContext {
            host: "cluster".to_string(),
            port: 22,
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            timeout: Duration::from_secs(5),
        };
        let rendered = format!("{:?}", ctx);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(ctx.address(), "cluster:22");
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }
}
