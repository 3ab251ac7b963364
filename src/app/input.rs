//! User input parser.
//!
//! Turns a terminal line into a [`ParsedInput`]. Lines starting with `/` are
//! commands; anything else is chat text for the current target.

use crabirc::irc::{Command, CommandError};
use thiserror::Error;

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedInput {
    Join { channel: String },
    Part { channel: Option<String>, reason: Option<String> },
    Msg { target: String, text: String },
    Notice { target: String, text: String },
    Nick { nick: String },
    Raw { command: Command },
    Quit { message: Option<String> },
    Text { text: String },
    Help,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    MissingArgument(&'static str),
    #[error("cannot send raw line: {0}")]
    Raw(CommandError),
}

pub const HELP: &str = "\
/join <#channel>            join a channel
/part [#channel] [reason]   leave a channel
/msg <target> <text>        send a private message
/notice <target> <text>     send a notice
/nick <nick>                change nickname
/raw <VERB> <args...>       send a raw protocol line
/quit [message]             disconnect and exit";

/// Parse one input line. Empty lines yield `Ok(None)`. Commands are
/// case-insensitive.
pub fn parse_input(input: &str) -> Result<Option<ParsedInput>, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let Some(body) = input.strip_prefix('/') else {
        return Ok(Some(ParsedInput::Text { text: input.to_string() }));
    };

    let parts: Vec<&str> = body.splitn(3, ' ').collect();
    let cmd = parts.first().map(|s| s.to_lowercase()).unwrap_or_default();
    let arg = |i: usize| parts.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());

    let parsed = match cmd.as_str() {
        "join" | "j" => {
            let channel = arg(1).ok_or(InputError::MissingArgument("/join <#channel>"))?;
            let channel = if !channel.starts_with('#') && !channel.starts_with('&') {
                format!("#{}", channel)
            } else {
                channel.to_string()
            };
            ParsedInput::Join { channel }
        }
        "part" | "leave" => match arg(1) {
            Some(a) if a.starts_with('#') || a.starts_with('&') => ParsedInput::Part {
                channel: Some(a.to_string()),
                reason: arg(2).map(str::to_string),
            },
            Some(_) => ParsedInput::Part {
                channel: None,
                reason: body.splitn(2, ' ').nth(1).map(|s| s.trim().to_string()),
            },
            None => ParsedInput::Part { channel: None, reason: None },
        },
        "msg" | "query" => {
            let target = arg(1).ok_or(InputError::MissingArgument("/msg <target> <text>"))?;
            let text = arg(2).ok_or(InputError::MissingArgument("/msg <target> <text>"))?;
            ParsedInput::Msg { target: target.to_string(), text: text.to_string() }
        }
        "notice" => {
            let target = arg(1).ok_or(InputError::MissingArgument("/notice <target> <text>"))?;
            let text = arg(2).ok_or(InputError::MissingArgument("/notice <target> <text>"))?;
            ParsedInput::Notice { target: target.to_string(), text: text.to_string() }
        }
        "nick" => {
            let nick = arg(1).ok_or(InputError::MissingArgument("/nick <nick>"))?;
            ParsedInput::Nick { nick: nick.to_string() }
        }
        "raw" | "quote" => {
            let line = body
                .splitn(2, ' ')
                .nth(1)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(InputError::MissingArgument("/raw <VERB> <args...>"))?;
            let command = Command::parse(line).map_err(InputError::Raw)?;
            ParsedInput::Raw { command }
        }
        "quit" | "exit" => ParsedInput::Quit {
            message: body.splitn(2, ' ').nth(1).map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        },
        "help" | "h" => ParsedInput::Help,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(parsed))
}
