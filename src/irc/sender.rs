//! Shared write side of a connection.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::command::Command;
use super::error::ConnectionError;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Cloneable handle that writes commands to the transport.
///
/// Writes are serialized through an async mutex, so concurrent callers and
/// the keepalive task never interleave partial lines. Once `closing` fires,
/// waiting and in-flight writes give up with [`ConnectionError::Closed`].
#[derive(Clone)]
pub struct CommandSender {
    writer: Arc<Mutex<Option<BoxedWriter>>>,
    closing: CancellationToken,
}

impl CommandSender {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_cancel(writer, CancellationToken::new())
    }

    /// Like [`new`](Self::new), aborting writes when `closing` is cancelled.
    pub fn with_cancel<W>(writer: W, closing: CancellationToken) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            writer: Arc::new(Mutex::new(Some(Box::new(writer)))),
            closing,
        }
    }

    /// Encode and write one command. Encoding errors are returned before any
    /// I/O happens.
    pub async fn send_command(&self, command: &Command) -> Result<(), ConnectionError> {
        let line = command.serialize()?;
        let mut guard = tokio::select! {
            _ = self.closing.cancelled() => return Err(ConnectionError::Closed),
            guard = self.writer.lock() => guard,
        };
        let writer = guard.as_mut().ok_or(ConnectionError::Closed)?;
        tokio::select! {
            _ = self.closing.cancelled() => return Err(ConnectionError::Closed),
            written = write_line(writer, &line) => written?,
        }
        trace!(line = line.trim_end(), "sent");
        Ok(())
    }

    pub async fn send<I, S>(&self, verb: &str, args: I) -> Result<(), ConnectionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_command(&Command::new(verb, args)).await
    }

    pub async fn send_privmsg(&self, target: &str, text: &str) -> Result<(), ConnectionError> {
        self.send("PRIVMSG", [target, text]).await
    }

    pub async fn send_notice(&self, target: &str, text: &str) -> Result<(), ConnectionError> {
        self.send("NOTICE", [target, text]).await
    }

    pub async fn send_join(&self, channel: &str) -> Result<(), ConnectionError> {
        self.send("JOIN", [channel]).await
    }

    pub async fn send_part(&self, channel: &str, reason: Option<&str>) -> Result<(), ConnectionError> {
        match reason {
            Some(reason) => self.send("PART", [channel, reason]).await,
            None => self.send("PART", [channel]).await,
        }
    }

    pub async fn send_nick(&self, nick: &str) -> Result<(), ConnectionError> {
        self.send("NICK", [nick]).await
    }

    pub async fn send_quit(&self, message: &str) -> Result<(), ConnectionError> {
        self.send("QUIT", [message]).await
    }

    /// Abort pending writes, then shut down and drop the writer. Later sends
    /// fail with [`ConnectionError::Closed`].
    pub async fn shutdown(&self) -> Result<(), ConnectionError> {
        self.closing.cancel();
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            writer.shutdown().await?;
        }
        Ok(())
    }

    pub async fn is_closed(&self) -> bool {
        self.writer.lock().await.is_none()
    }
}

async fn write_line(writer: &mut BoxedWriter, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
