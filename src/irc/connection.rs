//! The connection facade: socket ownership, background tasks, handshake.

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command::Command;
use super::dispatch::{self, DispatchExit};
use super::error::ConnectionError;
use super::identity;
use super::keepalive;
use super::listeners::{Listener, ListenerQueue, ListenerRegistry};
use super::sender::CommandSender;
use crate::config::ServerConfig;

/// Mode placeholder sent in the USER handshake.
const USER_MODE: &str = "0";
/// Unused placeholder sent in the USER handshake.
const USER_UNUSED: &str = "*";

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connected,
    Closed,
}

struct Session {
    sender: CommandSender,
    cancel: CancellationToken,
    dispatch: JoinHandle<DispatchExit>,
    keepalive: JoinHandle<()>,
}

enum State {
    Idle,
    Connected(Session),
    Closed,
}

/// One IRC session.
///
/// Created idle so listeners can be added before [`connect`](Self::connect)
/// and observe the registration exchange. All operations take `&self`; wrap
/// the connection in an `Arc` to share it between tasks. A connection is
/// single-use: once closed it cannot be reconnected.
pub struct Connection {
    address: String,
    nickname: String,
    realname: String,
    listeners: ListenerRegistry,
    state: Mutex<State>,
}

impl Connection {
    pub fn new(address: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            nickname: nickname.into(),
            realname: crate::config::model::default_realname(),
            listeners: ListenerRegistry::new(),
            state: Mutex::new(State::Idle),
        }
    }

    pub fn from_config(server: &ServerConfig) -> Self {
        Self::new(server.address(), server.nickname.clone()).with_realname(server.realname.clone())
    }

    /// Display name sent as the final USER parameter.
    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = realname.into();
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn state(&self) -> ConnectionState {
        match &*self.state.lock() {
            State::Idle => ConnectionState::Idle,
            State::Connected(_) => ConnectionState::Connected,
            State::Closed => ConnectionState::Closed,
        }
    }

    /// Open a TCP connection to the configured address, start the dispatch
    /// and keepalive tasks, and register NICK and USER.
    ///
    /// If the socket cannot be opened the connection stays idle and no task
    /// is started. If the handshake cannot be written the session is torn
    /// down again and the connection ends up closed.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        if self.state() != ConnectionState::Idle {
            return Err(ConnectionError::AlreadyConnected);
        }
        info!(address = %self.address, nick = %self.nickname, "connecting");
        let stream = TcpStream::connect(&self.address).await?;
        self.attach(stream).await
    }

    /// Like [`connect`](Self::connect) over an already-open transport.
    pub async fn attach<S>(&self, stream: S) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let sender = {
            let mut state = self.state.lock();
            if !matches!(*state, State::Idle) {
                return Err(ConnectionError::AlreadyConnected);
            }

            let (reader, writer) = tokio::io::split(stream);
            let cancel = CancellationToken::new();
            let sender = CommandSender::with_cancel(writer, cancel.clone());
            // Keepalive registers before the first line can be read.
            let keepalive = keepalive::spawn(sender.clone(), &self.listeners);
            let dispatch = tokio::spawn(dispatch::run(
                BufReader::new(reader),
                self.listeners.clone(),
                cancel.clone(),
            ));

            *state = State::Connected(Session {
                sender: sender.clone(),
                cancel,
                dispatch,
                keepalive,
            });
            sender
        };

        if let Err(e) = self.register(&sender).await {
            warn!(error = %e, "registration failed, closing");
            if let Err(close) = self.close().await {
                debug!(error = %close, "close after failed registration");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn register(&self, sender: &CommandSender) -> Result<(), ConnectionError> {
        sender.send_nick(&self.nickname).await?;
        let username = identity::username_or_fallback();
        sender
            .send(
                "USER",
                [
                    username.as_str(),
                    USER_MODE,
                    USER_UNUSED,
                    self.realname.as_str(),
                ],
            )
            .await?;
        debug!(nick = %self.nickname, user = %username, "registration sent");
        Ok(())
    }

    /// A handle for writing to this connection from other tasks.
    pub fn sender(&self) -> Result<CommandSender, ConnectionError> {
        match &*self.state.lock() {
            State::Idle => Err(ConnectionError::NotConnected),
            State::Connected(session) => Ok(session.sender.clone()),
            State::Closed => Err(ConnectionError::Closed),
        }
    }

    /// Build a command from `verb` and `args` and write it to the server.
    pub async fn send<I, S>(&self, verb: &str, args: I) -> Result<(), ConnectionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_command(&Command::new(verb, args)).await
    }

    pub async fn send_command(&self, command: &Command) -> Result<(), ConnectionError> {
        self.sender()?.send_command(command).await
    }

    /// Register a queue for every command decoded from now on.
    pub fn add_listener(&self, listener: Listener) {
        self.listeners.add(listener);
    }

    /// Create a queue of `capacity`, register it, and return its receiver.
    pub fn subscribe(&self, capacity: usize) -> ListenerQueue {
        let (tx, rx) = mpsc::channel(capacity);
        self.add_listener(tx);
        rx
    }

    /// Close the transport, close every listener queue, and wait for the
    /// background tasks to finish. No QUIT is sent.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        let session = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Closed) {
                State::Connected(session) => session,
                State::Idle => {
                    *state = State::Idle;
                    return Err(ConnectionError::NotConnected);
                }
                State::Closed => return Err(ConnectionError::Closed),
            }
        };

        session.cancel.cancel();
        let shutdown = session.sender.shutdown().await;

        match session.dispatch.await {
            Ok(exit) => debug!(?exit, "dispatch joined"),
            Err(e) => warn!(error = %e, "dispatch task panicked"),
        }
        if let Err(e) = session.keepalive.await {
            warn!(error = %e, "keepalive task panicked");
        }
        info!(address = %self.address, "connection closed");
        shutdown
    }
}
