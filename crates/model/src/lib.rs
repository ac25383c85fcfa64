#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod image;

use alloc::boxed::Box;

pub use chrono::{DateTime, FixedOffset, Utc};

/// A visitor-submitted question along with its (optional) answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Opaque identifier used in share links.
    pub id: Box<str>,
    /// The question itself. Never modified after submission.
    pub content: Box<str>,
    /// Remains `None` until an administrator answers the question.
    pub answer: Option<Box<str>>,
    /// Moment of submission.
    pub timestamp: DateTime<Utc>,
}

impl Question {
    pub const fn is_answered(&self) -> bool {
        self.answer.is_some()
    }

    /// Converts the submission time into the civil timezone used for display.
    pub fn local_timestamp(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.timestamp.with_timezone(&offset)
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedOffset, Question};
    use chrono::{TimeZone, Timelike, Utc};

    #[test]
    fn local_timestamp_applies_offset() {
        let question = Question {
            id: "abc".into(),
            content: "Hello?".into(),
            answer: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap(),
        };
        assert!(!question.is_answered());

        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let local = question.local_timestamp(offset);
        assert_eq!(local.hour(), 7);
        assert_eq!(local.timestamp(), question.timestamp.timestamp());
    }
}
