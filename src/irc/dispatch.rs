//! Read loop: decodes incoming lines and fans them out to listeners.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::command::Command;
use super::listeners::ListenerRegistry;

/// Longest accepted line, terminator included: a 512 byte message plus the
/// 8191 bytes IRCv3 allows for tags.
pub const MAX_LINE_LENGTH: usize = 512 + 8191;

/// Why the read loop stopped.
#[derive(Debug)]
pub enum DispatchExit {
    /// The owning connection was closed locally.
    Cancelled,
    /// The peer closed the transport.
    Eof,
    /// Reading from the transport failed.
    Failed(io::Error),
}

/// Run the read loop until the transport ends or `cancel` fires.
///
/// Malformed lines, and lines longer than [`MAX_LINE_LENGTH`], are logged
/// and skipped. Whatever ends the loop, every registered listener queue is
/// closed before returning.
pub async fn run<R>(mut reader: R, listeners: ListenerRegistry, cancel: CancellationToken) -> DispatchExit
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(512);
    let exit = loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => break DispatchExit::Cancelled,
            read = next_line(&mut reader, &mut buf) => read,
        };

        match read {
            Ok(Frame::Eof) => break DispatchExit::Eof,
            Ok(Frame::Line) => {}
            Ok(Frame::Oversized) => {
                warn!(max = MAX_LINE_LENGTH, "discarding oversized line");
                continue;
            }
            Err(e) => {
                error!(error = %e, "transport read failed, stopping dispatch");
                break DispatchExit::Failed(e);
            }
        }

        let line = String::from_utf8_lossy(&buf);
        match Command::parse(&line) {
            Ok(command) => {
                trace!(%command, "received");
                listeners.broadcast(command);
            }
            Err(e) => {
                warn!(line = %line.trim_end(), error = %e, "discarding malformed line");
            }
        }
    };

    match &exit {
        DispatchExit::Cancelled => debug!("dispatch cancelled"),
        DispatchExit::Eof => info!("server closed the connection"),
        DispatchExit::Failed(_) => {}
    }
    listeners.close();
    exit
}

enum Frame {
    Line,
    Oversized,
    Eof,
}

/// Read up to and including the next `\n` into `buf`. Bytes past
/// [`MAX_LINE_LENGTH`] are consumed without being buffered. A final line
/// without a terminator still counts as a line.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut oversized = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(match (oversized, buf.is_empty()) {
                (true, _) => Frame::Oversized,
                (false, true) => Frame::Eof,
                (false, false) => Frame::Line,
            });
        }

        let (done, used) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (true, i + 1),
            None => (false, available.len()),
        };
        if !oversized {
            if buf.len() + used > MAX_LINE_LENGTH {
                oversized = true;
                buf.clear();
            } else {
                buf.extend_from_slice(&available[..used]);
            }
        }
        reader.consume(used);

        if done {
            return Ok(if oversized { Frame::Oversized } else { Frame::Line });
        }
    }
}
