//! Conversion of chat-platform messages into conversation messages.

use parley_model::Message;

const MAX_NAME_LEN: usize = 64;

/// A message received from a chat platform.
pub trait PlatformMessage {
    /// Returns the text of the message.
    fn content(&self) -> &str;

    /// Returns `true` if the message was written by a bot, which makes it
    /// an assistant message.
    fn is_from_bot(&self) -> bool;

    /// Returns the display name of the author, if the platform has one.
    fn author_name(&self) -> Option<&str> {
        None
    }
}

/// Converts a platform message into a `user` or `assistant` message.
///
/// The content is kept byte for byte. The author name is reduced to the
/// characters providers accept in the `name` field, and dropped if nothing
/// is left.
pub fn from_platform<M: PlatformMessage + ?Sized>(message: &M) -> Message {
    let content = message.content().to_owned();
    let converted = if message.is_from_bot() {
        Message::assistant(content)
    } else {
        Message::user(content)
    };
    match message.author_name().and_then(sanitize_name) {
        Some(name) => converted.with_name(name),
        None => converted,
    }
}

/// Returns the text to show on the platform for `message`.
#[inline]
pub fn display_text(message: &Message) -> &str {
    message.content()
}

fn sanitize_name(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    (!sanitized.is_empty()).then_some(sanitized)
}

#[cfg(test)]
mod tests {
    use parley_model::Role;

    use super::*;

    struct Incoming {
        text: &'static str,
        bot: bool,
        author: Option<&'static str>,
    }

    impl PlatformMessage for Incoming {
        fn content(&self) -> &str {
            self.text
        }

        fn is_from_bot(&self) -> bool {
            self.bot
        }

        fn author_name(&self) -> Option<&str> {
            self.author
        }
    }

    #[test]
    fn test_roles() {
        let user = from_platform(&Incoming {
            text: "hi",
            bot: false,
            author: Some("alice"),
        });
        assert_eq!(user.role(), Role::User);
        assert_eq!(user.name(), Some("alice"));

        let bot = from_platform(&Incoming {
            text: "hello",
            bot: true,
            author: None,
        });
        assert_eq!(bot.role(), Role::Assistant);
        assert_eq!(bot.name(), None);
    }

    #[test]
    fn test_content_round_trip() {
        for text in ["", "plain", "  padded\n", "émoji 🎉 \u{0}", "a\r\nb"] {
            for bot in [false, true] {
                let message = from_platform(&Incoming {
                    text,
                    bot,
                    author: None,
                });
                assert_eq!(display_text(&message), text);
            }
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Jane Doe").as_deref(), Some("JaneDoe"));
        assert_eq!(sanitize_name("a.b@c").as_deref(), Some("a_b_c"));
        assert_eq!(sanitize_name("   "), None);
        assert_eq!(sanitize_name(&"x".repeat(100)).map(|n| n.len()), Some(64));
    }
}
