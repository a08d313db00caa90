//! Helpers shared by the integration tests.

#![allow(dead_code)]

use newsindex::{Lang, MessageId, StoredContent, StoredMessage};

pub fn eng() -> Lang {
    Lang::from_code("eng").unwrap()
}

pub fn rus() -> Lang {
    Lang::from_code("rus").unwrap()
}

/// Alphabetic word unique for `n`, so that it tokenizes as one plain word.
pub fn word(prefix: &str, n: usize) -> String {
    let digits: String = n
        .to_string()
        .bytes()
        .map(|d| char::from(b'a' + (d - b'0')))
        .collect();
    format!("{prefix}{digits}")
}

/// Broken down message with a content block.
pub fn message(id: u64, lang: Lang, title: &str, description: &str) -> StoredMessage {
    let mut msg = StoredMessage::new(
        MessageId::new(id),
        StoredContent::new(format!("http://news.test/{id}")),
    );
    msg.lang = lang;
    msg.break_down(title, description, &[], "", None).unwrap();
    msg
}

/// Message coming from feed `source_url`.
pub fn feed_message(id: u64, source_url: &str, title: &str) -> StoredMessage {
    let mut msg = message(id, eng(), title, "");
    msg.set_source_url(source_url);
    msg
}
