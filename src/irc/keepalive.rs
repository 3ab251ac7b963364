//! Automatic PING/PONG responder.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::command::Command;
use super::error::ConnectionError;
use super::listeners::{ListenerQueue, ListenerRegistry};
use super::sender::CommandSender;

/// Capacity of the responder's own listener queue.
pub const KEEPALIVE_QUEUE_CAPACITY: usize = 10;

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";

#[derive(Debug, Error)]
pub enum KeepaliveError {
    #[error("malformed PING command: {0}")]
    MalformedPing(Command),

    #[error("failed to send PONG: {0}")]
    Send(#[from] ConnectionError),
}

/// Register the responder as a listener and start it. The task ends when
/// the listener queue is closed.
pub fn spawn(sender: CommandSender, listeners: &ListenerRegistry) -> JoinHandle<()> {
    let (tx, rx) = mpsc::channel(KEEPALIVE_QUEUE_CAPACITY);
    listeners.add(tx);
    tokio::spawn(run(sender, rx))
}

pub async fn run(sender: CommandSender, mut queue: ListenerQueue) {
    while let Some(command) = queue.recv().await {
        if let Err(e) = respond(&sender, &command).await {
            warn!(error = %e, "keepalive");
        }
    }
    debug!("keepalive stopped");
}

/// Answer `command` if it is a PING; anything else is ignored.
pub async fn respond(sender: &CommandSender, command: &Command) -> Result<(), KeepaliveError> {
    if command.verb != PING {
        return Ok(());
    }
    let Some(token) = command.first_arg() else {
        return Err(KeepaliveError::MalformedPing(command.clone()));
    };
    sender.send(PONG, [token]).await?;
    Ok(())
}
