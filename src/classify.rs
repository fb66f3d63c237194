//! Rule-based small-talk gate.
//!
//! A message is conversational when its trimmed, lowercased start matches
//! one of the phrases below followed by a word boundary. Anything else is
//! substantive and goes through retrieval.

/// What kind of small talk a message opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallTalk {
    Greeting,
    Thanks,
    Farewell,
    StatusCheck,
    TimeOfDay,
    Acknowledgment,
    SelfReference,
}

/// Classification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Conversational(SmallTalk),
    Substantive,
}

impl MessageKind {
    pub fn needs_retrieval(&self) -> bool {
        matches!(self, Self::Substantive)
    }
}

/// Ordered phrase table. First match wins.
const PATTERNS: &[(SmallTalk, &[&str])] = &[
    (
        SmallTalk::Greeting,
        &["hi", "hello", "hey", "howdy", "greetings", "yo", "hiya"],
    ),
    (
        SmallTalk::Thanks,
        &["thanks", "thank you", "cheers", "ta", "much appreciated"],
    ),
    (
        SmallTalk::Farewell,
        &["bye", "goodbye", "see you", "later", "good night", "gn"],
    ),
    (
        SmallTalk::StatusCheck,
        &["how are you", "how's it going", "what's up", "whats up"],
    ),
    (
        SmallTalk::TimeOfDay,
        &["good morning", "good afternoon", "good evening"],
    ),
    (
        SmallTalk::Acknowledgment,
        &["yes", "no", "ok", "okay", "sure", "yep", "nope", "yeah", "nah"],
    ),
    (
        SmallTalk::SelfReference,
        &["who are you", "what are you", "tell me about yourself"],
    ),
];

pub fn classify(message: &str) -> MessageKind {
    let msg = message.trim().to_lowercase();
    for (kind, phrases) in PATTERNS {
        if phrases.iter().any(|p| starts_with_word(&msg, p)) {
            return MessageKind::Conversational(*kind);
        }
    }
    MessageKind::Substantive
}

pub fn is_conversational(message: &str) -> bool {
    !classify(message).needs_retrieval()
}

/// `text` starts with `phrase` and the phrase ends on a word boundary.
fn starts_with_word(text: &str, phrase: &str) -> bool {
    match text.strip_prefix(phrase) {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_')),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_talk_is_conversational() {
        for msg in [
            "hello there",
            "thanks a lot",
            "bye for now",
            "yes",
            "who are you?",
            "  Hi!",
            "HOWDY partner",
            "good morning ArmGPT",
            "What's up",
            "ok.",
            "tell me about yourself",
        ] {
            assert!(is_conversational(msg), "{msg:?} should be conversational");
        }
    }

    #[test]
    fn questions_are_substantive() {
        for msg in [
            "tell me about the first RISC processor",
            "when was Acorn founded?",
            "history of the ARM2",
            "",
        ] {
            assert!(!is_conversational(msg), "{msg:?} should be substantive");
        }
    }

    #[test]
    fn prefixes_need_a_word_boundary() {
        // "ta" must not swallow "take", nor "no" swallow "now"
        assert_eq!(classify("take me through the ARM1 design"), MessageKind::Substantive);
        assert_eq!(classify("nowadays which chips use ARM?"), MessageKind::Substantive);
        assert_eq!(classify("history of the hitachi port"), MessageKind::Substantive);
        assert_eq!(classify("yesterday's news about RISC OS"), MessageKind::Substantive);
    }

    #[test]
    fn anchored_at_message_start() {
        assert_eq!(classify("so anyway, hello"), MessageKind::Substantive);
    }

    #[test]
    fn first_matching_group_wins() {
        assert_eq!(
            classify("hello, who are you?"),
            MessageKind::Conversational(SmallTalk::Greeting)
        );
        assert_eq!(
            classify("good night!"),
            MessageKind::Conversational(SmallTalk::Farewell)
        );
        assert_eq!(
            classify("good evening"),
            MessageKind::Conversational(SmallTalk::TimeOfDay)
        );
        assert_eq!(
            classify("who are you"),
            MessageKind::Conversational(SmallTalk::SelfReference)
        );
    }
}
