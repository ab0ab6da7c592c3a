// ABOUTME: Direct injection: stream an archive into the target's root through a pipe.
// ABOUTME: A local pump feeds the pipe while the runtime's copy call drains it.

use super::cancellable;
use super::error::{ArchiveStreamSnafu, DirectCopySnafu, InjectError};
use crate::runtime::CopyOps;
use crate::types::ContainerId;
use snafu::ResultExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::sync::CancellationToken;

/// Default size of the in-memory pipe between the archive and the runtime.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

const CHUNK_SIZE: usize = 8 * 1024;

/// Why the local half of the pipe stopped early.
#[derive(Debug)]
enum PumpError {
    /// Reading the archive failed.
    Read(std::io::Error),
    /// The runtime side went away before the archive was fully written.
    Closed(std::io::Error),
}

/// Copy everything from `source` into the pipe, closing it when done.
///
/// The write half is owned here, so it is closed on every exit path.
async fn pump<A>(mut source: A, mut sink: DuplexStream) -> Result<u64, PumpError>
where
    A: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buf).await.map_err(PumpError::Read)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])
            .await
            .map_err(PumpError::Closed)?;
        total += n as u64;
    }
    sink.shutdown().await.map_err(PumpError::Closed)?;
    Ok(total)
}

/// Stream `archive` into the filesystem root of `container`.
///
/// Both halves run concurrently. A failure reading the archive is returned
/// even when the runtime reports success, because the runtime never saw a
/// complete stream. The runtime's error surfaces only when the archive was
/// read cleanly, or when the pipe broke because the runtime stopped reading.
#[tracing::instrument(skip_all, fields(container = %container.short()))]
pub async fn copy_direct<R, A>(
    runtime: &R,
    cancel: &CancellationToken,
    container: &ContainerId,
    archive: A,
    pipe_capacity: usize,
) -> Result<(), InjectError>
where
    R: CopyOps + ?Sized,
    A: AsyncRead + Send + Unpin,
{
    let (writer, reader) = tokio::io::duplex(pipe_capacity.max(1));

    let producer = pump(archive, writer);
    let consumer = cancellable(
        cancel,
        runtime.copy_to_container(container, "/", Box::new(reader)),
    );

    let (local, remote) = tokio::join!(producer, consumer);

    match local {
        Ok(bytes) => tracing::debug!(bytes, "archive streamed"),
        Err(PumpError::Read(source)) => return Err(source).context(ArchiveStreamSnafu),
        Err(PumpError::Closed(source)) => {
            // The reader was dropped early; report why, if the runtime knows.
            remote?.context(DirectCopySnafu {
                container: container.clone(),
            })?;
            return Err(source).context(ArchiveStreamSnafu);
        }
    }

    remote?.context(DirectCopySnafu {
        container: container.clone(),
    })
}
