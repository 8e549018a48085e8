//! Matcher predicate helpers shared by the operations.

use crate::irc::Message;

/// A NOTICE for the given channel whose `msg-id` tag is one of the given
/// identifiers. This is how Twitch reports most command failures.
pub fn matching_notice(
    channel_name: &str,
    notice_ids: &'static [&'static str],
) -> impl Fn(&Message) -> bool + Send + 'static {
    let channel_name = channel_name.to_string();
    move |msg: &Message| {
        msg.command == "NOTICE"
            && msg.channel_name() == Some(channel_name.as_str())
            && msg
                .tag("msg-id")
                .is_some_and(|id| notice_ids.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_listed_notice_ids_on_the_channel() {
        let matcher = matching_notice("forsen", &["msg_channel_suspended", "msg_banned"]);

        let suspended = Message::parse(
            "@msg-id=msg_channel_suspended :tmi.twitch.tv NOTICE #forsen :This channel has been suspended.",
        )
        .unwrap();
        assert!(matcher(&suspended));

        let banned = Message::parse(
            "@msg-id=msg_banned :tmi.twitch.tv NOTICE #forsen :You are permanently banned.",
        )
        .unwrap();
        assert!(matcher(&banned));
    }

    #[test]
    fn ignores_other_channels_ids_and_commands() {
        let matcher = matching_notice("forsen", &["msg_channel_suspended"]);

        let other_channel = Message::parse(
            "@msg-id=msg_channel_suspended :tmi.twitch.tv NOTICE #pajlada :This channel has been suspended.",
        )
        .unwrap();
        assert!(!matcher(&other_channel));

        let other_id = Message::parse(
            "@msg-id=slow_on :tmi.twitch.tv NOTICE #forsen :This room is now in slow mode.",
        )
        .unwrap();
        assert!(!matcher(&other_id));

        let not_notice =
            Message::parse("@msg-id=msg_channel_suspended :tmi.twitch.tv PRIVMSG #forsen :x")
                .unwrap();
        assert!(!matcher(&not_notice));

        let no_tag = Message::parse(":tmi.twitch.tv NOTICE #forsen :no tag here").unwrap();
        assert!(!matcher(&no_tag));
    }
}
