//! IRC command codec.
//!
//! Converts between the structured [`Command`] value and its wire-line form
//! (`[source] verb arg1 arg2 ... [:final arg with spaces]\r\n`). Pure
//! functions only; no I/O happens here.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Line terminator used on the wire.
pub const CRLF: &str = "\r\n";

/// Errors produced while serializing or parsing a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A non-final argument contains a space and cannot be encoded.
    #[error("nonfinal argument contains space: {0:?}")]
    MalformedArgument(String),

    /// A line could not be decoded into a command.
    #[error("invalid command: {reason}")]
    MalformedCommand { reason: &'static str },

    /// The command has no arguments; the wire form needs a final parameter.
    #[error("command {verb} has no arguments")]
    MissingArguments { verb: String },
}

/// One IRC protocol message.
///
/// Any IRC command consists of an optional source, the verb (`PING`,
/// `PRIVMSG`, `001`, ...) and a list of arguments of which only the last
/// one may contain spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub source: Option<String>,
    pub verb: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new<I, S>(verb: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: None,
            verb: verb.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source = (!source.is_empty()).then_some(source);
        self
    }

    /// The first argument, if any.
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// The last argument, usually the trailing text of a message.
    pub fn last_arg(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }

    /// Encode this command as a CRLF-terminated wire line.
    ///
    /// The source, when present, is emitted verbatim ahead of the verb. The
    /// final argument gets a `:` prefix only if it contains a space.
    pub fn serialize(&self) -> Result<String, CommandError> {
        let (last, init) = self
            .args
            .split_last()
            .ok_or_else(|| CommandError::MissingArguments {
                verb: self.verb.clone(),
            })?;

        if let Some(bad) = init.iter().find(|arg| arg.contains(' ')) {
            return Err(CommandError::MalformedArgument(bad.clone()));
        }

        let mut out: Vec<&str> = Vec::with_capacity(self.args.len() + 2);
        if let Some(source) = self.source.as_deref().filter(|s| !s.is_empty()) {
            out.push(source);
        }
        out.push(&self.verb);
        out.extend(init.iter().map(String::as_str));

        let mut line = out.join(" ");
        line.push(' ');
        if last.contains(' ') {
            line.push(':');
        }
        line.push_str(last);
        line.push_str(CRLF);
        Ok(line)
    }

    /// Decode one raw line, terminator included, into a command.
    ///
    /// The line is split on single spaces. A first token starting with `:`
    /// is the source. Tokens become arguments until one starts with `:`;
    /// that token (minus the colon) and everything after it are rejoined
    /// into the final argument. The terminator is stripped from whichever
    /// token ends up last. A line without arguments yields an empty `args`.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let tokens: Vec<&str> = raw.split(' ').collect();
        if tokens.len() < 2 {
            return Err(CommandError::MalformedCommand {
                reason: "less than two entries in command",
            });
        }

        let (source, verb, rest) = match tokens[0].strip_prefix(':') {
            Some(source) => (Some(source), tokens[1], &tokens[2..]),
            None => (None, tokens[0], &tokens[1..]),
        };

        let mut args: Vec<String> = Vec::with_capacity(rest.len());
        let mut iter = rest.iter();
        while let Some(token) = iter.next() {
            if let Some(first_word) = token.strip_prefix(':') {
                let words: Vec<&str> = std::iter::once(first_word)
                    .chain(iter.by_ref().copied())
                    .collect();
                args.push(words.join(" "));
                break;
            }
            args.push((*token).to_string());
        }

        let verb = match args.last_mut() {
            Some(last) => {
                let trimmed = strip_terminator(last).len();
                last.truncate(trimmed);
                verb.to_string()
            }
            None => strip_terminator(verb).to_string(),
        };

        if verb.is_empty() {
            return Err(CommandError::MalformedCommand {
                reason: "empty command verb",
            });
        }

        Ok(Self {
            source: source.filter(|s| !s.is_empty()).map(str::to_string),
            verb,
            args,
        })
    }
}

fn strip_terminator(s: &str) -> &str {
    s.strip_suffix(CRLF)
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Wire form as received, without the terminator: `:source` prefix and a
/// `:` ahead of a final argument that is empty, starts with `:` or holds a
/// space. Never fails, so it suits logs and transcripts.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, ":{} ", source)?;
        }
        f.write_str(&self.verb)?;
        if let Some((last, init)) = self.args.split_last() {
            for arg in init {
                write!(f, " {}", arg)?;
            }
            if last.is_empty() || last.starts_with(':') || last.contains(' ') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg_with_source() {
        let cmd = Command::parse(":irc.example.com PRIVMSG #chan :hello world\r\n").unwrap();
        assert_eq!(cmd.source.as_deref(), Some("irc.example.com"));
        assert_eq!(cmd.verb, "PRIVMSG");
        assert_eq!(cmd.args, vec!["#chan", "hello world"]);
    }

    #[test]
    fn test_parse_ping_without_source() {
        let cmd = Command::parse("PING :irc.example.com\r\n").unwrap();
        assert_eq!(cmd.source, None);
        assert_eq!(cmd.verb, "PING");
        assert_eq!(cmd.args, vec!["irc.example.com"]);
    }

    #[test]
    fn test_parse_strips_terminator_from_plain_last_arg() {
        let cmd = Command::parse(":srv 001 bob Welcome\r\n").unwrap();
        assert_eq!(cmd.args, vec!["bob", "Welcome"]);

        let cmd = Command::parse("NICK bob\r\n").unwrap();
        assert_eq!(cmd.args, vec!["bob"]);
    }

    #[test]
    fn test_parse_trailing_keeps_inner_colons_and_spaces() {
        let cmd = Command::parse("PRIVMSG #c :a :b  c\r\n").unwrap();
        assert_eq!(cmd.args, vec!["#c", "a :b  c"]);
    }

    #[test]
    fn test_parse_empty_trailing() {
        let cmd = Command::parse("TOPIC #c :\r\n").unwrap();
        assert_eq!(cmd.args, vec!["#c", ""]);
    }

    #[test]
    fn test_parse_without_arguments() {
        let cmd = Command::parse(":nick!u@h QUIT\r\n").unwrap();
        assert_eq!(cmd.source.as_deref(), Some("nick!u@h"));
        assert_eq!(cmd.verb, "QUIT");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_parse_bare_newline_terminator() {
        let cmd = Command::parse("PING :server\n").unwrap();
        assert_eq!(cmd.args, vec!["server"]);
    }

    #[test]
    fn test_parse_rejects_single_token() {
        assert!(matches!(
            Command::parse("BAD\r\n"),
            Err(CommandError::MalformedCommand { .. })
        ));
        assert!(matches!(
            Command::parse("PING"),
            Err(CommandError::MalformedCommand { .. })
        ));
        assert!(matches!(
            Command::parse(""),
            Err(CommandError::MalformedCommand { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_empty_verb() {
        assert!(Command::parse(" PING").is_err());
        assert!(Command::parse(":source \r\n").is_err());
    }

    #[test]
    fn test_from_str() {
        let cmd: Command = "JOIN #rust\r\n".parse().unwrap();
        assert_eq!(cmd, Command::new("JOIN", ["#rust"]));
    }

    #[test]
    fn test_serialize_simple() {
        let cmd = Command::new("NICK", ["bob"]);
        assert_eq!(cmd.serialize().unwrap(), "NICK bob\r\n");
    }

    #[test]
    fn test_serialize_source_and_trailing() {
        let cmd = Command::new("PRIVMSG", ["#x", "hi there"]).with_source("a");
        assert_eq!(cmd.serialize().unwrap(), "a PRIVMSG #x :hi there\r\n");
    }

    #[test]
    fn test_serialize_user_handshake_line() {
        let cmd = Command::new("USER", ["bob", "0", "*", "crabirc IRC client"]);
        assert_eq!(cmd.serialize().unwrap(), "USER bob 0 * :crabirc IRC client\r\n");
    }

    #[test]
    fn test_serialize_rejects_space_in_nonfinal_arg() {
        let cmd = Command::new("FOO", ["a b", "c"]);
        assert_eq!(
            cmd.serialize(),
            Err(CommandError::MalformedArgument("a b".into()))
        );
    }

    #[test]
    fn test_serialize_rejects_no_arguments() {
        let cmd = Command::new("QUIT", Vec::<String>::new());
        assert!(matches!(
            cmd.serialize(),
            Err(CommandError::MissingArguments { .. })
        ));
    }

    #[test]
    fn test_round_trip_without_source() {
        let cases = [
            Command::new("PRIVMSG", ["#rust", "hello there, world"]),
            Command::new("MODE", ["#rust", "+o", "bob"]),
            Command::new("PONG", ["irc.example.com"]),
            Command::new("TOPIC", ["#rust", ""]),
        ];
        for cmd in cases {
            let wire = cmd.serialize().unwrap();
            assert_eq!(Command::parse(&wire).unwrap(), cmd, "wire: {:?}", wire);
        }
    }

    #[test]
    fn test_display_is_wire_form() {
        let cmd = Command::new("PRIVMSG", ["#rust", "hello world"]).with_source("bob");
        assert_eq!(cmd.to_string(), ":bob PRIVMSG #rust :hello world");
        assert_eq!(Command::new("PING", ["x"]).to_string(), "PING x");
        assert_eq!(Command::new("TOPIC", ["#c", ""]).to_string(), "TOPIC #c :");

        let quit = Command::parse(":nick!u@h QUIT\r\n").unwrap();
        assert_eq!(quit.to_string(), ":nick!u@h QUIT");
    }

    #[test]
    fn test_display_parses_back() {
        let cmd = Command::new("PRIVMSG", ["#c", "a :b  c"]).with_source("srv");
        assert_eq!(Command::parse(&format!("{}\r\n", cmd)).unwrap(), cmd);
    }

    #[test]
    fn test_with_source_empty_is_none() {
        let cmd = Command::new("PING", ["x"]).with_source("");
        assert_eq!(cmd.source, None);
    }
}
