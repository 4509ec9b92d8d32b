use crate::roster::AdminRoster;

/// Chat trigger that opens a page request. Matched case-insensitively; the
/// trailing space is part of the trigger, so a bare `!pageadmin` is not one.
pub const PAGE_TRIGGER: &str = "!pageadmin ";

/// What one inbound chat line means to the pager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A player paged the admins. `text` may be empty.
    Request { requester: String, text: String },
    /// A rostered admin spoke while pages were pending.
    AdminReply { admin: String, text: String },
    Ignore,
}

/// Classify one chat line.
///
/// Chat relayed for a logged-in account arrives with speaker `"Server"` and
/// the real name embedded before a colon; a colon-less `Server` line is our
/// own echo and is ignored, and an embedded name containing a space is
/// narrative server text rather than an account name, also ignored.
///
/// A single leading `/` is a command-escape artifact and is stripped before
/// matching. Admin replies are only recognized while at least one page is
/// pending (`queue_nonempty`), per the queue's flush contract.
pub fn classify(
    speaker: &str,
    raw: &str,
    roster: &AdminRoster,
    queue_nonempty: bool,
) -> Classification {
    let mut speaker = speaker;
    // Trailing whitespace stays until after the trigger match; the trigger's
    // own trailing space is significant, so `"!pageadmin   "` is an empty
    // request rather than a near-miss of the bare trigger.
    let mut message = raw.trim_start();

    if speaker == "Server" {
        let Some(colon) = message.find(':') else {
            return Classification::Ignore;
        };
        let name = message[..colon].trim();
        if name.contains(' ') {
            return Classification::Ignore;
        }
        speaker = name;
        message = message[colon + 1..].trim_start();
    }

    let message = message.strip_prefix('/').unwrap_or(message);

    if let Some(rest) = strip_trigger(message) {
        return Classification::Request {
            requester: speaker.to_string(),
            text: rest.trim().to_string(),
        };
    }

    if queue_nonempty && roster.contains(speaker) {
        return Classification::AdminReply {
            admin: speaker.to_string(),
            text: message.trim_end().to_string(),
        };
    }

    Classification::Ignore
}

fn strip_trigger(message: &str) -> Option<&str> {
    let head = message.get(..PAGE_TRIGGER.len())?;
    if head.eq_ignore_ascii_case(PAGE_TRIGGER) {
        Some(&message[PAGE_TRIGGER.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{Classification, classify};
    use crate::roster::AdminRoster;

    fn roster_of(names: &[&str]) -> AdminRoster {
        let mut r = AdminRoster::new();
        for n in names {
            assert!(r.add(n));
        }
        r
    }

    #[test]
    fn relayed_request_unwraps_the_account_name() {
        let r = roster_of(&[]);
        let c = classify("Server", "PlayerOne: !pageadmin need help", &r, false);
        assert_eq!(
            c,
            Classification::Request {
                requester: "PlayerOne".to_string(),
                text: "need help".to_string(),
            }
        );
    }

    #[test]
    fn server_line_without_colon_is_our_own_echo() {
        let r = roster_of(&["PlayerOne"]);
        let c = classify("Server", "Round started", &r, true);
        assert_eq!(c, Classification::Ignore);
    }

    #[test]
    fn narrative_server_text_with_colon_is_ignored() {
        let r = roster_of(&[]);
        let c = classify("Server", "Round over: attackers win", &r, true);
        assert_eq!(c, Classification::Ignore);
    }

    #[test]
    fn trigger_is_case_insensitive() {
        let r = roster_of(&[]);
        let c = classify("Bob", "!PageAdmin cheater on alpha", &r, false);
        assert_eq!(
            c,
            Classification::Request {
                requester: "Bob".to_string(),
                text: "cheater on alpha".to_string(),
            }
        );
    }

    #[test]
    fn one_leading_slash_is_stripped() {
        let r = roster_of(&[]);
        let c = classify("Bob", "/!pageadmin help", &r, false);
        assert_eq!(
            c,
            Classification::Request {
                requester: "Bob".to_string(),
                text: "help".to_string(),
            }
        );
    }

    #[test]
    fn empty_request_text_is_valid() {
        let r = roster_of(&[]);
        let c = classify("Bob", "!pageadmin    ", &r, false);
        assert_eq!(
            c,
            Classification::Request {
                requester: "Bob".to_string(),
                text: String::new(),
            }
        );
    }

    #[test]
    fn relayed_empty_request_is_valid_too() {
        let r = roster_of(&[]);
        let c = classify("Server", "Bob: !pageadmin ", &r, false);
        assert_eq!(
            c,
            Classification::Request {
                requester: "Bob".to_string(),
                text: String::new(),
            }
        );
    }

    #[test]
    fn bare_trigger_without_space_is_not_a_request() {
        let r = roster_of(&[]);
        assert_eq!(
            classify("Bob", "!pageadmin", &r, false),
            Classification::Ignore
        );
    }

    #[test]
    fn admin_chat_resolves_only_while_pages_are_pending() {
        let r = roster_of(&["Mike"]);
        assert_eq!(
            classify("Mike", "on my way", &r, true),
            Classification::AdminReply {
                admin: "Mike".to_string(),
                text: "on my way".to_string(),
            }
        );
        assert_eq!(classify("Mike", "on my way", &r, false), Classification::Ignore);
    }

    #[test]
    fn non_admin_chat_is_ignored() {
        let r = roster_of(&["Mike"]);
        assert_eq!(
            classify("Bob", "hello there", &r, true),
            Classification::Ignore
        );
    }

    #[test]
    fn relayed_admin_reply_uses_the_embedded_name() {
        let r = roster_of(&["Mike"]);
        let c = classify("Server", "Mike: handled it", &r, true);
        assert_eq!(
            c,
            Classification::AdminReply {
                admin: "Mike".to_string(),
                text: "handled it".to_string(),
            }
        );
    }
}
