//! Terminal front end: reads input lines, prints server traffic.

pub mod input;

use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{info, warn};

use crabirc::config::ServerConfig;
use crabirc::irc::{Command, Connection, ConnectionError, ListenerQueue};

use self::input::{parse_input, ParsedInput, HELP};

/// Numeric sent by the server once registration succeeds.
const RPL_WELCOME: &str = "001";

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    server: ServerConfig,
    conn: Arc<Connection>,
    /// Where bare text goes: the last joined channel or /msg target.
    target: Option<String>,
}

impl App {
    pub fn new(server: ServerConfig, conn: Arc<Connection>) -> Self {
        Self {
            server,
            conn,
            target: None,
        }
    }

    /// Run until the user quits, stdin closes, or the server goes away.
    pub async fn run(&mut self, mut incoming: ListenerQueue) -> Result<()> {
        let mut stdin = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
        loop {
            tokio::select! {
                command = incoming.recv() => match command {
                    Some(command) => self.on_server_command(&command).await,
                    None => {
                        info!("connection ended");
                        break;
                    }
                },
                line = stdin.next() => match line {
                    Some(Ok(line)) => {
                        if self.on_input(&line).await == Flow::Quit {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "failed to read input");
                        break;
                    }
                    None => break,
                },
            }
        }
        Ok(())
    }

    async fn on_server_command(&mut self, command: &Command) {
        println!("<- {}", command);
        if command.verb != RPL_WELCOME {
            return;
        }
        let sender = match self.conn.sender() {
            Ok(sender) => sender,
            Err(e) => return self.report(Err(e)),
        };
        for channel in &self.server.channels {
            self.report(sender.send_join(channel).await);
        }
        if self.target.is_none() {
            self.target = self.server.channels.first().cloned();
        }
    }

    async fn on_input(&mut self, line: &str) -> Flow {
        let parsed = match parse_input(line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                eprintln!("!! {}", e);
                return Flow::Continue;
            }
        };
        let sender = match self.conn.sender() {
            Ok(sender) => sender,
            Err(e) => {
                self.report(Err(e));
                return Flow::Quit;
            }
        };

        let result = match parsed {
            ParsedInput::Join { channel } => {
                let result = sender.send_join(&channel).await;
                self.target = Some(channel);
                result
            }
            ParsedInput::Part { channel, reason } => {
                let Some(channel) = channel.or_else(|| self.target.take()) else {
                    eprintln!("!! no channel to part");
                    return Flow::Continue;
                };
                sender.send_part(&channel, reason.as_deref()).await
            }
            ParsedInput::Msg { target, text } => {
                let result = sender.send_privmsg(&target, &text).await;
                self.target = Some(target);
                result
            }
            ParsedInput::Notice { target, text } => sender.send_notice(&target, &text).await,
            ParsedInput::Nick { nick } => sender.send_nick(&nick).await,
            ParsedInput::Raw { command } => sender.send_command(&command).await,
            ParsedInput::Text { text } => match &self.target {
                Some(target) => sender.send_privmsg(target, &text).await,
                None => {
                    eprintln!("!! no target; /join a channel or /msg someone first");
                    return Flow::Continue;
                }
            },
            ParsedInput::Quit { message } => {
                let message = message.as_deref().unwrap_or(&self.server.quit_message);
                self.report(sender.send_quit(message).await);
                return Flow::Quit;
            }
            ParsedInput::Help => {
                println!("{}", HELP);
                return Flow::Continue;
            }
        };
        self.report(result);
        Flow::Continue
    }

    fn report(&self, result: Result<(), ConnectionError>) {
        if let Err(e) = result {
            eprintln!("!! {}", e);
        }
    }
}
