//! Canned content behind the auth gate.
//!
//! The real device asks an LLM for jokes, quotes, and riddles. The
//! emulator answers from small fixed pools so front-end tests are fast and
//! deterministic-ish (random pick, stable shape). Memos are the four
//! user-editable quick messages, stored in memory with the same length
//! rule and placeholder expansion the firmware applies.

use parking_lot::Mutex;
use rand::RngExt;

/// Maximum characters accepted by the print endpoint.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Maximum characters per memo.
pub const MEMO_MAX_CHARS: usize = 500;

/// Number of memo slots on the device.
pub const MEMO_COUNT: usize = 4;

const JOKES: &[&str] = &[
    "I told my thermal printer a joke. It didn't laugh, but it did feel the warmth.",
    "Why did the receipt apply for a job? It wanted to make an impression.",
    "I have a joke about paper jams, but it never comes out right.",
    "What do you call a printer that sings? A dot-matrix soprano.",
    "My printer and I have a lot in common. We both run out of patience at 10%.",
    "Why was the printout so calm? It had processed its feelings.",
];

const QUOTES: &[&str] = &[
    "Simplicity is the soul of efficiency. — Austin Freeman",
    "The best way to predict the future is to invent it. — Alan Kay",
    "Make it work, make it right, make it fast. — Kent Beck",
    "Well begun is half done. — Aristotle",
    "Whatever you are, be a good one. — attributed to Abraham Lincoln",
    "There is no substitute for hard work. — Thomas Edison",
];

struct Riddle {
    question: &'static str,
    answer: &'static str,
}

const RIDDLES: &[Riddle] = &[
    Riddle {
        question: "I speak without a mouth and hear without ears. What am I?",
        answer: "An echo",
    },
    Riddle {
        question: "The more of me you take, the more you leave behind. What am I?",
        answer: "Footsteps",
    },
    Riddle {
        question: "I have keys but open no locks. What am I?",
        answer: "A keyboard",
    },
    Riddle {
        question: "What gets wetter the more it dries?",
        answer: "A towel",
    },
];

pub fn random_joke() -> &'static str {
    JOKES[rand::rng().random_range(0..JOKES.len())]
}

pub fn random_quote() -> &'static str {
    QUOTES[rand::rng().random_range(0..QUOTES.len())]
}

/// Returns `(question, answer)`.
pub fn random_riddle() -> (&'static str, &'static str) {
    let riddle = &RIDDLES[rand::rng().random_range(0..RIDDLES.len())];
    (riddle.question, riddle.answer)
}

/// Why a print message was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("Message cannot be empty")]
    Empty,
    #[error("Content too long: got {0} characters")]
    TooLong(usize),
    #[error("Message contains null bytes which are not allowed")]
    NullByte,
    #[error("Memo id must be between 1 and {MEMO_COUNT}")]
    InvalidSlot,
}

/// Validate a message destined for the print head.
pub fn validate_message(message: &str) -> Result<(), MessageError> {
    if message.is_empty() {
        return Err(MessageError::Empty);
    }
    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(MessageError::TooLong(chars));
    }
    if message.contains('\0') {
        return Err(MessageError::NullByte);
    }
    Ok(())
}

/// The four quick-print memo slots.
pub struct MemoStore {
    memos: Mutex<[String; MEMO_COUNT]>,
}

impl Default for MemoStore {
    fn default() -> Self {
        Self {
            memos: Mutex::new([
                "Back in 10 minutes".into(),
                "Shopping: milk, bread, {date}".into(),
                "Meet at the usual place at {time}".into(),
                String::new(),
            ]),
        }
    }
}

impl MemoStore {
    /// Raw stored text for slot `id` (1-based). `None` when out of range.
    pub fn get(&self, id: usize) -> Option<String> {
        (1..=MEMO_COUNT)
            .contains(&id)
            .then(|| self.memos.lock()[id - 1].clone())
    }

    /// Stored text with placeholders substituted, ready for the print head.
    pub fn get_expanded(&self, id: usize) -> Option<String> {
        self.get(id).map(|raw| expand_placeholders(&raw))
    }

    /// Replace slot `id` (1-based). Enforces the memo length rule; memos,
    /// unlike print messages, may be empty.
    pub fn set(&self, id: usize, content: &str) -> Result<(), MessageError> {
        if !(1..=MEMO_COUNT).contains(&id) {
            return Err(MessageError::InvalidSlot);
        }
        let chars = content.chars().count();
        if chars > MEMO_MAX_CHARS {
            return Err(MessageError::TooLong(chars));
        }
        self.memos.lock()[id - 1] = content.to_string();
        Ok(())
    }

    pub fn all(&self) -> Vec<String> {
        self.memos.lock().to_vec()
    }
}

/// Substitute `{date}` and `{time}` with the current local values.
pub fn expand_placeholders(text: &str) -> String {
    let now = chrono::Local::now();
    text.replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{time}", &now.format("%H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_pools_are_nonempty() {
        assert!(!random_joke().is_empty());
        assert!(!random_quote().is_empty());
        let (question, answer) = random_riddle();
        assert!(!question.is_empty());
        assert!(!answer.is_empty());
    }

    #[test]
    fn message_validation_rules() {
        assert!(validate_message("hello").is_ok());
        assert_eq!(validate_message(""), Err(MessageError::Empty));
        assert!(matches!(
            validate_message(&"x".repeat(MAX_MESSAGE_CHARS + 1)),
            Err(MessageError::TooLong(_))
        ));
        assert_eq!(validate_message("a\0b"), Err(MessageError::NullByte));
    }

    #[test]
    fn message_limit_counts_chars_not_bytes() {
        let message = "ü".repeat(MAX_MESSAGE_CHARS);
        assert!(validate_message(&message).is_ok());
    }

    #[test]
    fn memo_roundtrip_and_bounds() {
        let store = MemoStore::default();
        store.set(4, "note to self").unwrap();
        assert_eq!(store.get(4).as_deref(), Some("note to self"));

        assert!(store.get(0).is_none());
        assert!(store.get(5).is_none());
    }

    #[test]
    fn memo_may_be_empty_but_not_oversized() {
        let store = MemoStore::default();
        assert!(store.set(1, "").is_ok());
        assert!(matches!(
            store.set(1, &"x".repeat(MEMO_MAX_CHARS + 1)),
            Err(MessageError::TooLong(_))
        ));
    }

    #[test]
    fn placeholders_are_substituted() {
        let expanded = expand_placeholders("d={date} t={time}");
        assert!(!expanded.contains("{date}"));
        assert!(!expanded.contains("{time}"));
        // YYYY-MM-DD
        assert_eq!(expanded.split("d=").nth(1).unwrap().split(' ').next().unwrap().len(), 10);
    }

    #[test]
    fn expanded_memo_differs_from_raw_when_placeholder_present() {
        let store = MemoStore::default();
        store.set(2, "today is {date}").unwrap();
        let expanded = store.get_expanded(2).unwrap();
        assert!(expanded.starts_with("today is "));
        assert!(!expanded.contains("{date}"));
    }
}
