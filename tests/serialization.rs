//! Binary serialization of indexed messages.

mod common;

use common::{eng, message};
use newsindex::{
    DefaultMessageBuilder, DictionaryMorphology, IndexConfig, IndexErrorKind, MessageId,
    RawImage, SearchableMessageMap, StoredContent, StoredMessage,
};

fn indexed() -> StoredMessage {
    let mut dict = DictionaryMorphology::new();
    dict.add_word("markets", 10, eng())
        .add_word("market", 10, eng())
        .add_word("rally", 11, eng())
        .add_stop_word("the", 1, eng());

    let mut msg = StoredMessage::new(MessageId::new(42), StoredContent::new("http://s.test/42"));
    msg.lang = eng();
    msg.set_source_url("http://s.test/rss");
    let images = [RawImage {
        src: "http://s.test/i.png".into(),
        width: 64,
        height: 48,
        alt: "Trading floor".into(),
        ..Default::default()
    }];
    msg.break_down(
        "The markets rally",
        "Asian market opens higher, traders cheer.",
        &images,
        "stocks",
        None,
    )
    .unwrap();
    msg.set_normal_forms(&dict).unwrap();

    let mut map = SearchableMessageMap::new(IndexConfig::default());
    map.insert(&message(1, eng(), "Other story", "nothing here"), 0, 0)
        .unwrap();
    map.insert(&msg, 50, 10).unwrap().unwrap().clone()
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_broken_down_round_trip() {
    let msg = indexed();
    assert!(!msg.core_words.is_empty());

    let mut buf = Vec::new();
    msg.write_broken_down(&mut buf).unwrap();

    let mut restored = StoredMessage::default();
    let version = restored.read_broken_down(buf.as_slice()).unwrap();
    assert_eq!(version, 5);
    assert_eq!(restored.word_positions, msg.word_positions);
    assert_eq!(restored.norm_form_positions, msg.norm_form_positions);
    assert_eq!(restored.positions, msg.positions);
    assert_eq!(restored.core_words, msg.core_words);
    assert_eq!(restored.description_pos, msg.description_pos);
    assert_eq!(restored.img_alt_pos, msg.img_alt_pos);
    assert_eq!(restored.keywords_pos, msg.keywords_pos);
    assert_eq!(restored.source_url(), "http://s.test/rss");
    assert_eq!(restored.hostname(), "s.test");
}

#[test]
fn test_text_survives_with_content() {
    let msg = indexed();
    let mut broken_down = Vec::new();
    let mut content = Vec::new();
    msg.write_broken_down(&mut broken_down).unwrap();
    msg.write_content(&mut content).unwrap();

    let mut restored = StoredMessage::default();
    restored.read_broken_down(broken_down.as_slice()).unwrap();
    restored.read_content(content.as_slice()).unwrap();

    let mut out = String::new();
    assert!(restored
        .assemble_description(&mut DefaultMessageBuilder::new(&mut out))
        .unwrap());
    assert_eq!(out, "Asian market opens higher, traders cheer.");

    let mut out = String::new();
    assert!(restored
        .assemble_image_alt(&mut DefaultMessageBuilder::new(&mut out), 0)
        .unwrap());
    assert_eq!(out, "Trading floor");

    let image = &restored.content.as_ref().unwrap().images[0];
    assert_eq!((image.width, image.height), (64, 48));
    assert_eq!(image.src, "http://s.test/i.png");
}

// =============================================================================
// Rejected input
// =============================================================================

#[test]
fn test_future_version_rejected() {
    let msg = indexed();
    let mut buf = Vec::new();
    msg.write_broken_down(&mut buf).unwrap();
    buf[0] = 6;

    let mut restored = StoredMessage::default();
    let err = restored.read_broken_down(buf.as_slice()).unwrap_err();
    assert!(matches!(err.kind(), IndexErrorKind::UnsupportedVersion(6)));
    assert!(restored.word_positions.is_empty());
}

#[test]
fn test_truncated_stream_rejected() {
    let msg = indexed();
    let mut buf = Vec::new();
    msg.write_broken_down(&mut buf).unwrap();
    buf.truncate(buf.len() - 3);

    let mut restored = StoredMessage::default();
    let err = restored.read_broken_down(buf.as_slice()).unwrap_err();
    assert!(matches!(err.kind(), IndexErrorKind::Io(_)));
}
