//! Line-based wire format spoken to the chat transport.
//!
//! One record per line, fields separated by tabs. Inbound:
//!
//! ```text
//! chat<TAB><scope><TAB><speaker><TAB><message>
//! servermsg<TAB><message>
//! serverinfo<TAB><map><TAB><mode><TAB><players><TAB><max_players>
//! ```
//!
//! Outbound commands, written on the same connection:
//!
//! ```text
//! say<TAB><scope><TAB><text>
//! yell<TAB><duration_s><TAB><scope><TAB><text>
//! ```
//!
//! Scopes: `all`, `team:<id>`, `squad:<team>:<id>`, `player:<name>`.

use std::fmt;

/// Where a chat line was heard, or where outbound text should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatScope {
    All,
    Team(u32),
    Squad(u32, u32),
    Player(String),
}

impl ChatScope {
    pub fn parse(s: &str) -> Result<Self, FeedError> {
        if s == "all" {
            return Ok(ChatScope::All);
        }
        if let Some(rest) = s.strip_prefix("team:") {
            let id = rest
                .parse()
                .map_err(|_| FeedError::BadScope(s.to_string()))?;
            return Ok(ChatScope::Team(id));
        }
        if let Some(rest) = s.strip_prefix("squad:") {
            let (team, squad) = rest
                .split_once(':')
                .ok_or_else(|| FeedError::BadScope(s.to_string()))?;
            let team = team
                .parse()
                .map_err(|_| FeedError::BadScope(s.to_string()))?;
            let squad = squad
                .parse()
                .map_err(|_| FeedError::BadScope(s.to_string()))?;
            return Ok(ChatScope::Squad(team, squad));
        }
        if let Some(name) = s.strip_prefix("player:") {
            if name.is_empty() {
                return Err(FeedError::BadScope(s.to_string()));
            }
            return Ok(ChatScope::Player(name.to_string()));
        }
        Err(FeedError::BadScope(s.to_string()))
    }
}

impl fmt::Display for ChatScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatScope::All => write!(f, "all"),
            ChatScope::Team(t) => write!(f, "team:{t}"),
            ChatScope::Squad(t, s) => write!(f, "squad:{t}:{s}"),
            ChatScope::Player(name) => write!(f, "player:{name}"),
        }
    }
}

/// Latest known round metadata, pushed by the transport. Absent until the
/// first `serverinfo` record arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSnapshot {
    pub map: String,
    pub game_mode: String,
    pub player_count: u32,
    pub max_player_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Chat {
        scope: ChatScope,
        speaker: String,
        message: String,
    },
    ServerMessage {
        message: String,
    },
    ServerInfo(ServerSnapshot),
}

#[derive(Debug, Clone)]
pub enum FeedError {
    Empty,
    UnknownRecord(String),
    Malformed(&'static str),
    BadScope(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Empty => write!(f, "empty feed line"),
            FeedError::UnknownRecord(k) => write!(f, "unknown record type: {k:?}"),
            FeedError::Malformed(s) => write!(f, "malformed record: {s}"),
            FeedError::BadScope(s) => write!(f, "bad scope: {s:?}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Parse one inbound feed line (no trailing newline).
pub fn parse_event(line: &str) -> Result<FeedEvent, FeedError> {
    if line.is_empty() {
        return Err(FeedError::Empty);
    }
    let (kind, rest) = line.split_once('\t').unwrap_or((line, ""));
    match kind {
        "chat" => {
            let mut it = rest.splitn(3, '\t');
            let scope = it
                .next()
                .filter(|s| !s.is_empty())
                .ok_or(FeedError::Malformed("chat: missing scope"))?;
            let speaker = it
                .next()
                .ok_or(FeedError::Malformed("chat: missing speaker"))?;
            let message = it
                .next()
                .ok_or(FeedError::Malformed("chat: missing message"))?;
            Ok(FeedEvent::Chat {
                scope: ChatScope::parse(scope)?,
                speaker: speaker.to_string(),
                message: message.to_string(),
            })
        }
        "servermsg" => Ok(FeedEvent::ServerMessage {
            message: rest.to_string(),
        }),
        "serverinfo" => {
            let mut it = rest.splitn(4, '\t');
            let map = it
                .next()
                .filter(|s| !s.is_empty())
                .ok_or(FeedError::Malformed("serverinfo: missing map"))?;
            let game_mode = it
                .next()
                .ok_or(FeedError::Malformed("serverinfo: missing mode"))?;
            let player_count = it
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or(FeedError::Malformed("serverinfo: bad player count"))?;
            let max_player_count = it
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or(FeedError::Malformed("serverinfo: bad max player count"))?;
            Ok(FeedEvent::ServerInfo(ServerSnapshot {
                map: map.to_string(),
                game_mode: game_mode.to_string(),
                player_count,
                max_player_count,
            }))
        }
        other => Err(FeedError::UnknownRecord(other.to_string())),
    }
}

/// Encode an outbound `say` command (no trailing newline).
pub fn encode_say(scope: &ChatScope, text: &str) -> String {
    format!("say\t{scope}\t{text}")
}

/// Encode an outbound `yell` command (no trailing newline).
pub fn encode_yell(scope: &ChatScope, duration_s: u32, text: &str) -> String {
    format!("yell\t{duration_s}\t{scope}\t{text}")
}

#[cfg(test)]
mod tests {
    use super::{ChatScope, FeedError, FeedEvent, encode_say, encode_yell, parse_event};

    #[test]
    fn parses_global_chat() {
        let ev = parse_event("chat\tall\tBob\thello there").unwrap();
        assert_eq!(
            ev,
            FeedEvent::Chat {
                scope: ChatScope::All,
                speaker: "Bob".to_string(),
                message: "hello there".to_string(),
            }
        );
    }

    #[test]
    fn chat_message_keeps_embedded_tabs() {
        let ev = parse_event("chat\tsquad:1:2\tBob\ta\tb\tc").unwrap();
        assert_eq!(
            ev,
            FeedEvent::Chat {
                scope: ChatScope::Squad(1, 2),
                speaker: "Bob".to_string(),
                message: "a\tb\tc".to_string(),
            }
        );
    }

    #[test]
    fn parses_serverinfo() {
        let ev = parse_event("serverinfo\tmetro\tconquest\t48\t64").unwrap();
        let FeedEvent::ServerInfo(s) = ev else {
            panic!("expected serverinfo");
        };
        assert_eq!(s.map, "metro");
        assert_eq!(s.game_mode, "conquest");
        assert_eq!(s.player_count, 48);
        assert_eq!(s.max_player_count, 64);
    }

    #[test]
    fn parses_servermsg() {
        let ev = parse_event("servermsg\tRound restarting").unwrap();
        assert_eq!(
            ev,
            FeedEvent::ServerMessage {
                message: "Round restarting".to_string(),
            }
        );
    }

    #[test]
    fn rejects_unknown_records_and_bad_scopes() {
        assert!(matches!(
            parse_event("ping\tx"),
            Err(FeedError::UnknownRecord(_))
        ));
        assert!(matches!(
            parse_event("chat\tworld\tBob\thi"),
            Err(FeedError::BadScope(_))
        ));
        assert!(matches!(
            parse_event("serverinfo\tmetro\tconquest\tmany\t64"),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn scope_round_trips_through_display() {
        for s in [
            ChatScope::All,
            ChatScope::Team(2),
            ChatScope::Squad(1, 3),
            ChatScope::Player("Bob".to_string()),
        ] {
            assert_eq!(ChatScope::parse(&s.to_string()).unwrap(), s);
        }
    }

    #[test]
    fn encodes_outbound_commands() {
        assert_eq!(
            encode_say(&ChatScope::Team(2), "move up"),
            "say\tteam:2\tmove up"
        );
        assert_eq!(
            encode_yell(&ChatScope::All, 10, "server restart soon"),
            "yell\t10\tall\tserver restart soon"
        );
    }
}
