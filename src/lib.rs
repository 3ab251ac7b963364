//! crabirc: a minimal async IRC client engine.
//!
//! A [`Connection`](irc::Connection) owns one socket, decodes every line into
//! an [`irc::Command`], fans it out to any number of listener queues and
//! answers server PINGs on its own.

pub mod config;
pub mod irc;
pub mod logging;
