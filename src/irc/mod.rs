//! IRC client engine: wire codec, connection management, listener fan-out
//! and the automatic PING responder.

pub mod command;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod keepalive;
pub mod listeners;
pub mod sender;

pub use command::{Command, CommandError};
pub use connection::{Connection, ConnectionState};
pub use error::ConnectionError;
pub use listeners::{Listener, ListenerQueue, ListenerRegistry};
pub use sender::CommandSender;
