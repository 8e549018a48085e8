//! IRC message parsing and formatting.
//!
//! Twitch chat speaks RFC1459-style lines with IRCv3 message tags:
//! `@key=value;key2=value2 :prefix COMMAND params :trailing`. Parsing is
//! fallible with a typed error so the connection can surface malformed
//! lines without dying, and every parsed message keeps its raw source
//! line — matcher predicates and error texts are built from it.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Why a line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line is empty")]
    EmptyLine,
    #[error("no space after the tags section")]
    UnterminatedTags,
    #[error("no space after the prefix section")]
    UnterminatedPrefix,
    #[error("line has no command")]
    MissingCommand,
    #[error("command \"{0}\" is not alphabetic or a 3-digit numeric")]
    InvalidCommand(String),
}

/// A parsed IRC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The line this message was parsed from, without the trailing CRLF.
    pub raw_source: String,
    /// IRCv3 message tags (empty if none).
    pub tags: HashMap<String, String>,
    /// `server` or `nick!user@host`.
    pub prefix: Option<String>,
    /// Uppercased command, e.g. `PRIVMSG` or `001`.
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse a raw IRC line, including optional message tags.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(ParseError::EmptyLine);
        }

        let raw_source = line.to_string();
        let mut rest = line;

        let tags = if let Some(tag_section) = rest.strip_prefix('@') {
            let end = tag_section.find(' ').ok_or(ParseError::UnterminatedTags)?;
            rest = tag_section[end + 1..].trim_start_matches(' ');
            parse_tags(&tag_section[..end])
        } else {
            HashMap::new()
        };

        let prefix = if let Some(prefix_section) = rest.strip_prefix(':') {
            let end = prefix_section
                .find(' ')
                .ok_or(ParseError::UnterminatedPrefix)?;
            let prefix = prefix_section[..end].to_string();
            rest = prefix_section[end + 1..].trim_start_matches(' ');
            Some(prefix)
        } else {
            None
        };

        let mut params = Vec::new();
        let command_word;

        if let Some(space) = rest.find(' ') {
            command_word = &rest[..space];
            rest = &rest[space + 1..];

            while !rest.is_empty() {
                if let Some(trailing) = rest.strip_prefix(':') {
                    params.push(trailing.to_string());
                    break;
                }
                if let Some(space) = rest.find(' ') {
                    params.push(rest[..space].to_string());
                    rest = &rest[space + 1..];
                } else {
                    params.push(rest.to_string());
                    break;
                }
            }
        } else {
            command_word = rest;
        }

        if command_word.is_empty() {
            return Err(ParseError::MissingCommand);
        }
        let is_numeric =
            command_word.len() == 3 && command_word.chars().all(|c| c.is_ascii_digit());
        let is_word = command_word.chars().all(|c| c.is_ascii_alphabetic());
        if !is_numeric && !is_word {
            return Err(ParseError::InvalidCommand(command_word.to_string()));
        }

        Ok(Message {
            raw_source,
            tags,
            prefix,
            command: command_word.to_ascii_uppercase(),
            params,
        })
    }

    /// Build an outbound message (no tags, no prefix).
    pub fn new(command: &str, params: Vec<&str>) -> Self {
        let command = command.to_ascii_uppercase();
        let params: Vec<String> = params.into_iter().map(|s| s.to_string()).collect();
        let mut message = Message {
            raw_source: String::new(),
            tags: HashMap::new(),
            prefix: None,
            command,
            params,
        };
        message.raw_source = message.to_string();
        message
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn last_param(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// The channel this message concerns: the first parameter starting
    /// with `#`, with the `#` stripped. `NOTICE * :...`-style messages
    /// have no channel.
    pub fn channel_name(&self) -> Option<&str> {
        self.param(0).and_then(|p| p.strip_prefix('#'))
    }

    /// A tag value; `None` when the tag is absent.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The nick part of the prefix (`nick!user@host` → `nick`).
    pub fn prefix_nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.split('!').next().unwrap_or(p))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            write!(f, "@")?;
            let mut first = true;
            for (key, value) in &self.tags {
                if !first {
                    write!(f, ";")?;
                }
                first = false;
                if value.is_empty() {
                    write!(f, "{key}")?;
                } else {
                    write!(f, "{key}={}", escape_tag_value(value))?;
                }
            }
            write!(f, " ")?;
        }

        if let Some(ref prefix) = self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)?;
        for (i, param) in self.params.iter().enumerate() {
            if i == self.params.len() - 1
                && (param.contains(' ') || param.starts_with(':') || param.is_empty())
            {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

/// Parse IRCv3 tag string: `key=value;key2=value2`
fn parse_tags(tag_str: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for pair in tag_str.split(';') {
        if pair.is_empty() {
            continue;
        }
        if let Some((key, value)) = pair.split_once('=') {
            tags.insert(key.to_string(), unescape_tag_value(value));
        } else {
            tags.insert(pair.to_string(), String::new());
        }
    }
    tags
}

/// Unescape IRCv3 tag values.
/// `\:` → `;`, `\s` → space, `\\` → `\`, `\r` → CR, `\n` → LF
fn unescape_tag_value(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(':') => result.push(';'),
                Some('s') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some('r') => result.push('\r'),
                Some('n') => result.push('\n'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Escape a value for IRCv3 tag encoding.
/// `;` → `\:`, space → `\s`, `\` → `\\`, CR → `\r`, LF → `\n`
fn escape_tag_value(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ';' => result.push_str("\\:"),
            ' ' => result.push_str("\\s"),
            '\\' => result.push_str("\\\\"),
            '\r' => result.push_str("\\r"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let msg = Message::parse("NICK alice").unwrap();
        assert!(msg.tags.is_empty());
        assert_eq!(msg.command, "NICK");
        assert_eq!(msg.params, vec!["alice"]);
        assert_eq!(msg.raw_source, "NICK alice");
    }

    #[test]
    fn parse_strips_crlf_from_raw_source() {
        let msg = Message::parse("PING :token\r\n").unwrap();
        assert_eq!(msg.raw_source, "PING :token");
    }

    #[test]
    fn parse_with_tags() {
        let msg = Message::parse(
            "@badge-info=;msg-id=slow_on :tmi.twitch.tv NOTICE #forsen :This room is now in slow mode.",
        )
        .unwrap();
        assert_eq!(msg.tag("msg-id").unwrap(), "slow_on");
        assert_eq!(msg.tag("badge-info").unwrap(), "");
        assert_eq!(msg.prefix.as_deref(), Some("tmi.twitch.tv"));
        assert_eq!(msg.command, "NOTICE");
        assert_eq!(
            msg.params,
            vec!["#forsen", "This room is now in slow mode."]
        );
    }

    #[test]
    fn parse_with_prefix_no_tags() {
        let msg = Message::parse(":tmi.twitch.tv 001 justinfan12345 :Welcome, GLHF!").unwrap();
        assert!(msg.tags.is_empty());
        assert_eq!(msg.prefix.as_deref(), Some("tmi.twitch.tv"));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.last_param(), Some("Welcome, GLHF!"));
    }

    #[test]
    fn parse_valueless_tag() {
        let msg = Message::parse("@draft/reply PRIVMSG #chan :text").unwrap();
        assert_eq!(msg.tag("draft/reply").unwrap(), "");
    }

    #[test]
    fn parse_tags_with_escapes() {
        let msg =
            Message::parse("@system-msg=5\\sraiders\\sarrived :tmi.twitch.tv USERNOTICE #pajlada")
                .unwrap();
        assert_eq!(msg.tag("system-msg").unwrap(), "5 raiders arrived");
    }

    #[test]
    fn tag_escaping_roundtrip() {
        let original = "hello world; backslash\\ and\nnewline";
        let escaped = escape_tag_value(original);
        let unescaped = unescape_tag_value(&escaped);
        assert_eq!(unescaped, original);
    }

    #[test]
    fn channel_name_strips_hash() {
        let msg = Message::parse(":x!x@x.tmi.twitch.tv JOIN #pajlada").unwrap();
        assert_eq!(msg.channel_name(), Some("pajlada"));

        let msg = Message::parse(":tmi.twitch.tv NOTICE * :Improperly formatted auth").unwrap();
        assert_eq!(msg.channel_name(), None);
    }

    #[test]
    fn prefix_nick_from_hostmask() {
        let msg = Message::parse(
            ":justinfan12345!justinfan12345@justinfan12345.tmi.twitch.tv JOIN #pajlada",
        )
        .unwrap();
        assert_eq!(msg.prefix_nick(), Some("justinfan12345"));

        let msg = Message::parse(":tmi.twitch.tv PONG tmi.twitch.tv :x").unwrap();
        assert_eq!(msg.prefix_nick(), Some("tmi.twitch.tv"));
    }

    #[test]
    fn command_is_uppercased() {
        let msg = Message::parse("ping :abc").unwrap();
        assert_eq!(msg.command, "PING");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(Message::parse(""), Err(ParseError::EmptyLine));
        assert_eq!(Message::parse("\r\n"), Err(ParseError::EmptyLine));
        assert_eq!(
            Message::parse(":tmi.twitch.tv"),
            Err(ParseError::UnterminatedPrefix)
        );
        assert_eq!(
            Message::parse("@msg-id=slow_on"),
            Err(ParseError::UnterminatedTags)
        );
        assert_eq!(
            Message::parse("12 not-a-command"),
            Err(ParseError::InvalidCommand("12".to_string()))
        );
        assert_eq!(
            Message::parse("PRIV@MSG #chan :hi"),
            Err(ParseError::InvalidCommand("PRIV@MSG".to_string()))
        );
    }

    #[test]
    fn format_outbound_message() {
        let msg = Message::new("PRIVMSG", vec!["#chan", "hello there"]);
        assert_eq!(msg.to_string(), "PRIVMSG #chan :hello there");

        let msg = Message::new("cap", vec!["REQ", "twitch.tv/commands twitch.tv/tags"]);
        assert_eq!(
            msg.to_string(),
            "CAP REQ :twitch.tv/commands twitch.tv/tags"
        );
    }

    #[test]
    fn parse_format_roundtrip() {
        let line = ":tmi.twitch.tv NOTICE #forsen :This room is now in slow mode.";
        let msg = Message::parse(line).unwrap();
        assert_eq!(msg.to_string(), line);
    }
}
