//! Concurrent draining of a child's stdout and stderr.
//!
//! Reading one pipe to completion before touching the other deadlocks as
//! soon as the child fills the unread pipe's kernel buffer. Both handles
//! are therefore polled from a single task: whichever is readable first is
//! read, one bounded chunk at a time, until both report end-of-stream.

use tokio::io::{AsyncRead, AsyncReadExt};

use super::line_buffer::{CaptureOverflow, StreamCapture};
use super::output::StreamSource;
use super::sink::LineSink;

#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    #[error("Failed to read {stream}: {source}")]
    Read {
        stream: StreamSource,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Overflow(#[from] CaptureOverflow),
}

/// Drain both readers into their captures until each hits end-of-stream.
///
/// Byte order within a stream is preserved. The relative order of stdout
/// and stderr chunks follows readiness and is not otherwise guaranteed.
pub async fn drain<O, E>(
    mut stdout: O,
    mut stderr: E,
    stdout_capture: &mut StreamCapture,
    stderr_capture: &mut StreamCapture,
    sink: &dyn LineSink,
    chunk_size: usize,
) -> Result<(), DrainError>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout_buf = vec![0u8; chunk_size.max(1)];
    let mut stderr_buf = vec![0u8; chunk_size.max(1)];
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        tokio::select! {
            read = stdout.read(&mut stdout_buf), if stdout_open => {
                let n = read.map_err(|source| DrainError::Read {
                    stream: StreamSource::Stdout,
                    source,
                })?;
                if n == 0 {
                    stdout_open = false;
                    stdout_capture.finish(sink);
                    tracing::trace!("stdout reached end-of-stream");
                } else {
                    stdout_capture.record(&stdout_buf[..n], sink)?;
                }
            }
            read = stderr.read(&mut stderr_buf), if stderr_open => {
                let n = read.map_err(|source| DrainError::Read {
                    stream: StreamSource::Stderr,
                    source,
                })?;
                if n == 0 {
                    stderr_open = false;
                    stderr_capture.finish(sink);
                    tracing::trace!("stderr reached end-of-stream");
                } else {
                    stderr_capture.record(&stderr_buf[..n], sink)?;
                }
            }
        }
    }

    Ok(())
}
