//! Listener registry and non-blocking fan-out.
//!
//! Every listener is a bounded `mpsc` queue. Delivery first tries a
//! non-blocking `try_send`; when the queue is full the command is handed to a
//! detached delivery task for that one queue, so a slow consumer never stalls
//! the read loop or the other listeners. While such a task is active, later
//! commands for the same queue join its backlog, keeping per-queue FIFO order.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{
    self,
    error::{TryRecvError, TrySendError},
};
use tracing::{debug, trace};

use super::command::Command;

/// The sending half of a listener queue.
pub type Listener = mpsc::Sender<Arc<Command>>;

/// The receiving half handed to consumers.
pub type ListenerQueue = mpsc::Receiver<Arc<Command>>;

struct Entry {
    tx: Listener,
    /// Backlog of the active deferred delivery task, if any.
    backlog: Mutex<Option<mpsc::UnboundedSender<Arc<Command>>>>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Arc<Entry>>,
    closed: bool,
}

/// Set of output queues that receive every decoded command.
///
/// Cheap to clone; clones share the same set.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queue. After [`close`](Self::close) the queue is dropped
    /// immediately so its receiver observes end-of-stream.
    pub fn add(&self, tx: Listener) {
        let mut inner = self.inner.write();
        if inner.closed {
            debug!("listener registered after close, closing it");
            return;
        }
        inner.entries.push(Arc::new(Entry {
            tx,
            backlog: Mutex::new(None),
        }));
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    /// Deliver `command` to every registered queue without blocking.
    pub fn broadcast(&self, command: Command) {
        let command = Arc::new(command);
        // Snapshot so registration never waits on delivery.
        let entries: Vec<Arc<Entry>> = self.inner.read().entries.clone();
        for entry in entries {
            deliver(&entry, Arc::clone(&command));
        }
    }

    /// Drop every queue. Pending deferred deliveries still complete before
    /// their receiver sees the queue close.
    pub fn close(&self) {
        let entries = {
            let mut inner = self.inner.write();
            inner.closed = true;
            std::mem::take(&mut inner.entries)
        };
        for entry in &entries {
            entry.backlog.lock().take();
        }
        debug!(listeners = entries.len(), "closed listener queues");
    }
}

fn deliver(entry: &Arc<Entry>, command: Arc<Command>) {
    let mut backlog = entry.backlog.lock();
    if let Some(pending) = backlog.as_ref() {
        // The drain task holds the receiver for as long as the slot is set.
        let _ = pending.send(command);
        return;
    }

    match entry.tx.try_send(command) {
        Ok(()) => {}
        Err(TrySendError::Closed(_)) => {
            trace!("listener queue closed by consumer, skipping");
        }
        Err(TrySendError::Full(command)) => {
            trace!("listener queue full, deferring delivery");
            let (pending_tx, pending_rx) = mpsc::unbounded_channel();
            let _ = pending_tx.send(command);
            *backlog = Some(pending_tx);
            tokio::spawn(drain_backlog(Arc::clone(entry), pending_rx));
        }
    }
}

/// Deferred delivery unit: waits for room in one queue until its backlog is
/// empty, then exits.
async fn drain_backlog(entry: Arc<Entry>, mut pending: mpsc::UnboundedReceiver<Arc<Command>>) {
    loop {
        let next = {
            let mut backlog = entry.backlog.lock();
            match pending.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => {
                    // Our sender is still alive, so the slot is ours.
                    *backlog = None;
                    None
                }
                // close() dropped the slot and everything queued is delivered.
                Err(TryRecvError::Disconnected) => None,
            }
        };
        let Some(command) = next else {
            break;
        };
        if entry.tx.send(command).await.is_err() {
            trace!("listener queue closed during deferred delivery");
        }
    }
}
