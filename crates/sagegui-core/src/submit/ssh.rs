use ssh2::Session;
use std::io::{self, ErrorKind, Read};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{chmod_command, submit_command, CommandOutput, JobSubmitter, SubmissionReceipt};
use crate::connection::ConnectionContext;
use crate::error::{Error, Result};

/// Submits over a transient SSH session, separate from the store's channel.
pub struct SshJobSubmitter {
    ctx: ConnectionContext,
    submit: String,
}

impl SshJobSubmitter {
    pub fn new(ctx: ConnectionContext, submit: impl Into<String>) -> Self {
        Self {
            ctx,
            submit: submit.into(),
        }
    }
}

fn run(session: &Session, command: &str) -> Result<CommandOutput> {
    debug!("ssh exec: {}", command);
    let mut channel = session
        .channel_session()
        .map_err(|e| Error::Connection(format!("cannot open exec channel: {}", e)))?;
    channel
        .exec(command)
        .map_err(|e| Error::Connection(format!("cannot run '{}': {}", command, e)))?;

    let idle_limit = match session.timeout() {
        0 => None,
        millis => Some(Duration::from_millis(u64::from(millis))),
    };
    let mut stderr_stream = channel.stderr();
    session.set_blocking(false);
    let drained = drain(&mut channel, &mut stderr_stream, idle_limit);
    session.set_blocking(true);
    let (stdout, stderr) = drained.map_err(|e| Error::io(command, e))?;

    channel.wait_close().map_err(|e| {
        Error::Connection(format!("channel for '{}' did not close: {}", command, e))
    })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_status: channel.exit_status().ok(),
    })
}

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Read both streams to EOF, taking whatever each has ready in turn.
///
/// Both streams share one channel window, so reading them one after the other
/// can stall when the unread one fills it. `idle_limit` bounds the time spent
/// with neither stream making progress.
fn drain<O: Read, E: Read>(
    stdout: &mut O,
    stderr: &mut E,
    idle_limit: Option<Duration>,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut out_open = true;
    let mut err_open = true;
    let mut buf = [0u8; 8192];
    let mut last_progress = Instant::now();

    while out_open || err_open {
        let mut progressed = false;
        if out_open {
            match read_ready(stdout, &mut buf, &mut out)? {
                Some(0) => out_open = false,
                Some(_) => progressed = true,
                None => {}
            }
        }
        if err_open {
            match read_ready(stderr, &mut buf, &mut err)? {
                Some(0) => err_open = false,
                Some(_) => progressed = true,
                None => {}
            }
        }

        if progressed {
            last_progress = Instant::now();
        } else if out_open || err_open {
            if idle_limit.is_some_and(|limit| last_progress.elapsed() > limit) {
                return Err(io::Error::new(
                    ErrorKind::TimedOut,
                    "remote command produced no output before the session timeout",
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
    Ok((out, err))
}

/// `None` when the reader has nothing ready yet, `Some(0)` at EOF.
fn read_ready<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    sink: &mut Vec<u8>,
) -> io::Result<Option<usize>> {
    match reader.read(buf) {
        Ok(n) => {
            sink.extend_from_slice(&buf[..n]);
            Ok(Some(n))
        }
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(None),
        Err(e) => Err(e),
    }
}

impl JobSubmitter for SshJobSubmitter {
    fn submit(&self, script_path: &str) -> Result<SubmissionReceipt> {
        let session = self.ctx.open_session()?;

        let chmod = run(&session, &chmod_command(script_path))?;
        if chmod.failed() {
            return Ok(SubmissionReceipt::from_output(script_path, chmod));
        }

        let output = run(&session, &submit_command(&self.submit, script_path))?;
        info!(
            "Submitted {} via {} (status {:?})",
            script_path,
            self.ctx.address(),
            output.exit_status
        );
        Ok(SubmissionReceipt::from_output(script_path, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays chunks, with `None` standing for "nothing ready yet".
    struct Scripted(VecDeque<Option<Vec<u8>>>);

    impl Scripted {
        fn new(steps: Vec<Option<&[u8]>>) -> Self {
            Scripted(steps.into_iter().map(|s| s.map(<[u8]>::to_vec)).collect())
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(None) => Err(io::Error::new(ErrorKind::WouldBlock, "pending")),
                Some(Some(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.0.push_front(Some(chunk[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }
    }

    #[test]
    fn test_drain_collects_both_streams_while_one_is_pending() {
        let big = vec![b'e'; 20_000];
        let job: &[u8] = b"Submitted batch job 42\n";
        let tail: &[u8] = b"done\n";
        let mut stdout = Scripted::new(vec![None, None, None, Some(job)]);
        let mut stderr = Scripted::new(vec![Some(&big[..]), None, Some(tail)]);

        let (out, err) = drain(&mut stdout, &mut stderr, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(out, b"Submitted batch job 42\n");
        assert_eq!(err.len(), big.len() + 5);
        assert!(err.ends_with(b"done\n"));
    }

    #[test]
    fn test_drain_gives_up_when_idle() {
        let mut stdout = Scripted::new(vec![None; 10_000]);
        let mut stderr = Scripted::new(vec![]);

        let err = drain(&mut stdout, &mut stderr, Some(Duration::from_millis(20))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }
}
