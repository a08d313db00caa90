//! End-to-end scenarios of the searchable message map.

mod common;

use std::sync::Arc;

use common::{eng, feed_message, message, word};
use newsindex::metrics::TimeMeters;
use newsindex::morphology::pseudo_id;
use newsindex::word_pair::{long_time_index, short_time_index, WordPair, WordPairStore};
use newsindex::{
    Country, DictionaryMorphology, IndexConfig, IndexErrorKind, InMemoryWordPairStore, Lang,
    MessageId, SearchableMessageMap, StoredContent, StoredMessage, TokenType, WordPositions,
};

// =============================================================================
// Feed stop words
// =============================================================================

#[test]
fn test_word_in_every_feed_message_stops_being_core() {
    let source = "http://wire.test/rss";
    let mut map = SearchableMessageMap::default();
    let breaking = pseudo_id("breaking");

    for i in 0..5 {
        let title = format!("Breaking {} {}", word("q", i), word("z", i));
        let msg = feed_message(i as u64 + 1, source, &title);
        let core = map.insert(&msg, 100, 10).unwrap().unwrap().core_words.clone();
        if i == 0 {
            assert!(core.contains(&breaking), "first message ranks it");
        } else {
            assert!(!core.contains(&breaking), "message {i} still ranks it");
            assert_eq!(core.len(), 2);
        }
    }

    let feed = map.feed(source).unwrap();
    assert_eq!(feed.message_count(), 5);
    assert_eq!(feed.words[&breaking], 5);

    let last = map.find(MessageId::new(5)).unwrap();
    let freq = map.calc_words_freq(last, false).unwrap();
    let info = freq
        .word_infos
        .iter()
        .find(|wi| wi.text == "breaking")
        .unwrap();
    assert_eq!(info.token_type, TokenType::FeedStopWord);
    assert_eq!(info.cw_weight, 0.0);
    assert!(info.feed_countable);
}

#[test]
fn test_feed_removed_with_last_message() {
    let source = "http://wire.test/rss";
    let mut map = SearchableMessageMap::default();
    map.insert(&feed_message(1, source, "Quiet morning"), 100, 10)
        .unwrap();
    map.insert(&feed_message(2, source, "Busy evening"), 100, 10)
        .unwrap();

    map.remove(MessageId::new(1)).unwrap().unwrap();
    assert_eq!(map.feed(source).unwrap().message_count(), 1);
    map.remove(MessageId::new(2)).unwrap().unwrap();
    assert!(map.feed(source).is_none());
    map.check_consistency().unwrap();
}

// =============================================================================
// Signatures and duplicates
// =============================================================================

fn url_only(id: u64, url: &str) -> StoredMessage {
    let mut msg = StoredMessage::new(MessageId::new(id), StoredContent::new(url));
    msg.break_down("", "", &[], "", None).unwrap();
    msg
}

#[test]
fn test_url_signed_messages() {
    let mut map = SearchableMessageMap::default();
    let a = url_only(1, "http://x.test/1");
    let b = url_only(2, "http://x.test/2");
    assert_ne!(a.signature, b.signature);

    assert!(map.insert(&a, 0, 0).unwrap().is_some());
    assert!(map.insert(&b, 0, 0).unwrap().is_some());
    assert!(map.insert(&url_only(3, "http://x.test/1"), 0, 0).unwrap().is_none());

    let mut worded = StoredMessage::new(MessageId::new(4), StoredContent::new("http://x.test/1"));
    worded.break_down("Quiet day", "", &[], "", None).unwrap();
    assert_ne!(worded.signature, a.signature);
    assert!(map.insert(&worded, 0, 0).unwrap().is_some());
    assert_eq!(map.len(), 3);
}

#[test]
fn test_same_text_from_other_feed() {
    let text = "Same story text";
    let mut map = SearchableMessageMap::default();
    assert!(map
        .insert(&feed_message(1, "http://one.test/rss", text), 0, 0)
        .unwrap()
        .is_some());
    assert!(map
        .insert(&feed_message(2, "http://two.test/rss", text), 0, 0)
        .unwrap()
        .is_some());
    assert!(map
        .insert(&feed_message(3, "http://one.test/rss", text), 0, 0)
        .unwrap()
        .is_none());
    assert!(map
        .insert(&feed_message(1, "http://three.test/rss", "Other words"), 0, 0)
        .unwrap()
        .is_none());
}

#[test]
fn test_duplicate_suppression() {
    let mut map = SearchableMessageMap::new(IndexConfig {
        suppress_duplicates: true,
        ..Default::default()
    });
    let mut a = feed_message(1, "http://one.test/rss", "Same story text");
    a.url_signature = a.compute_url_signature();
    assert!(map.insert(&a, 0, 0).unwrap().is_some());

    let mut b = feed_message(2, "http://two.test/rss", "Same story text");
    b.url_signature = b.compute_url_signature();
    assert!(map.insert(&b, 0, 0).unwrap().is_none());

    let mut c = feed_message(3, "http://two.test/rss", "Entirely different");
    c.url_signature = a.url_signature;
    assert!(map.insert(&c, 0, 0).unwrap().is_none());

    map.remove(a.id).unwrap();
    assert!(map.insert(&c, 0, 0).unwrap().is_some());
    map.check_consistency().unwrap();
}

#[test]
fn test_viewer_accepts_duplicates() {
    let mut map = SearchableMessageMap::new(IndexConfig {
        viewer: true,
        ..Default::default()
    });
    let mut a = message(1, eng(), "Same words here", "");
    a.core_words = vec![7, 8];
    let b = message(2, eng(), "Same words here", "");
    assert!(map.insert(&a, 100, 10).unwrap().is_some());
    assert!(map.insert(&b, 100, 10).unwrap().is_some());

    assert_eq!(map.find(a.id).unwrap().core_words, [7, 8]);
    assert!(map.find(b.id).unwrap().core_words.is_empty());
    assert_eq!(map.lang_message_count(eng()), 0);
    assert_eq!(map.lang_message_count(Lang::NULL), 2);
    assert_eq!(map.word_messages("same").unwrap().len(), 2);
    map.check_consistency().unwrap();
}

// =============================================================================
// Categories
// =============================================================================

#[test]
fn test_category_path_expansion() {
    let mut map = SearchableMessageMap::default();
    let mut msg = message(1, eng(), "Nested topic", "");
    msg.country = Country::from_code("us").unwrap();
    msg.categories = vec!["/A/B/C".to_string()];
    let stored = map.insert(&msg, 0, 0).unwrap().unwrap();
    assert_eq!(stored.category_paths, ["/", "/A/", "/A/B/", "/A/B/C/"]);

    let number = map.number(msg.id).unwrap();
    for path in ["", "A/", "a/b/", "/A/B/C/"] {
        let node = map.find_category(path).unwrap();
        assert!(node.messages().contains(&number), "missing under `{path}`");
    }
    assert!(map.find_category("A/X/").is_none());
    assert_eq!(map.category_message_count(Lang::NULL, Country::NULL, "/A/B/"), 1);
    assert_eq!(map.category_message_count(eng(), Country::NULL, "/A/"), 1);
    assert_eq!(map.category_message_count(eng(), msg.country, "/A/B/C/"), 1);

    map.remove(msg.id).unwrap().unwrap();
    assert!(map.find_category("").unwrap().messages().is_empty());
    for path in ["A/", "A/B/", "A/B/C/"] {
        assert!(map.find_category(path).is_none());
    }
    assert_eq!(map.category_message_count(Lang::NULL, Country::NULL, "/A/"), 0);
}

#[test]
fn test_changing_categories() {
    let mut map = SearchableMessageMap::default();
    let mut msg = message(1, eng(), "Moving topic", "");
    msg.categories = vec!["/News/World".to_string()];
    map.insert(&msg, 0, 0).unwrap();

    map.set_categories(msg.id, vec!["/Sport".to_string()]).unwrap();
    assert!(map.find_category("news/").is_none());
    assert_eq!(map.find_category("sport/").unwrap().messages().len(), 1);

    map.add_category(msg.id, "/Tech/AI").unwrap();
    assert_eq!(map.find_category("tech/ai/").unwrap().messages().len(), 1);
    assert_eq!(
        map.find(msg.id).unwrap().category_paths,
        ["/", "/Sport/", "/Tech/", "/Tech/AI/"]
    );

    let err = map.add_category(msg.id, "tech").unwrap_err();
    assert!(matches!(err.kind(), IndexErrorKind::InvalidCategory { .. }));
    assert_eq!(map.find(msg.id).unwrap().categories.len(), 2);
    map.check_consistency().unwrap();
}

// =============================================================================
// Words, normal forms and proper names
// =============================================================================

#[test]
fn test_normal_forms_become_core_words() {
    let mut dict = DictionaryMorphology::new();
    dict.add_word("market", 10, eng()).add_word("markets", 10, eng());

    let mut msg = message(1, eng(), "Market news", "markets up");
    msg.set_normal_forms(&dict).unwrap();
    let mut map = SearchableMessageMap::default();
    let stored = map.insert(&msg, 100, 10).unwrap().unwrap();

    assert!(stored.core_words.contains(&10));
    assert!(stored.norm_form_positions.get(&10).unwrap().is_core());
    assert!(stored.word_positions.get("market").unwrap().is_core());
    assert_eq!(map.norm_form_messages(10).unwrap().len(), 1);
    assert_eq!(map.word_messages("markets").unwrap().len(), 1);
}

#[test]
fn test_capitalized_word_becomes_proper_name() {
    let mut map = SearchableMessageMap::default();
    let flags = |map: &SearchableMessageMap, id: u64| {
        map.find(MessageId::new(id))
            .unwrap()
            .word_positions
            .get("obama")
            .unwrap()
            .flags
    };

    map.insert(&message(1, eng(), "Obama speaks", ""), 100, 10)
        .unwrap();
    assert_eq!(flags(&map, 1) & WordPositions::PROPER_NAME, 0);

    map.insert(&message(2, eng(), "Obama travels", ""), 100, 10)
        .unwrap();
    assert_ne!(flags(&map, 2) & WordPositions::PROPER_NAME, 0);
    assert!(map.word_messages("obama").unwrap().proper_name(eng()));
}

// =============================================================================
// Word pairs
// =============================================================================

#[test]
fn test_word_pair_counters_follow_core_words() {
    let store = Arc::new(InMemoryWordPairStore::new());
    let mut map = SearchableMessageMap::default().with_word_pair_store(store.clone());
    let mut msg = message(1, eng(), "Alpha beta gamma", "");
    msg.published = 1_700_000_000;
    let core = map.insert(&msg, 100, 10).unwrap().unwrap().core_words.clone();
    assert_eq!(core.len(), 3);

    // three singles and three pairs, in the short and the long bucket
    assert_eq!(store.len(), 12);
    let pair = WordPair::new(core[0], core[2]);
    assert_eq!(store.get(eng(), short_time_index(msg.published), pair), 1);
    assert_eq!(store.get(eng(), long_time_index(msg.published), pair), 1);

    map.remove(msg.id).unwrap().unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_pair_ranking_keeps_selection() {
    let store = Arc::new(InMemoryWordPairStore::new());
    let mut ranked = SearchableMessageMap::default().with_word_pair_store(store);
    let mut plain = SearchableMessageMap::default();

    for i in 0..6 {
        let title = format!("Alpha beta {} {}", word("w", i), word("v", i));
        let mut msg = message(i as u64 + 1, eng(), &title, "");
        msg.published = 1_700_000_000 + i as u64 * 60;
        let mut with_pairs = ranked.insert(&msg, 100, 4).unwrap().unwrap().core_words.clone();
        let mut without = plain.insert(&msg, 100, 4).unwrap().unwrap().core_words.clone();
        with_pairs.sort_unstable();
        without.sort_unstable();
        assert_eq!(with_pairs, without);
    }
    ranked.check_consistency().unwrap();
}

// =============================================================================
// Observability and configuration
// =============================================================================

#[test]
fn test_operations_are_timed() {
    let meters = Arc::new(TimeMeters::default());
    let mut map = SearchableMessageMap::default().with_metrics(meters.clone());
    map.insert(&message(1, eng(), "One story", ""), 0, 0).unwrap();
    map.insert(&message(2, eng(), "Two stories", ""), 0, 0).unwrap();
    map.remove(MessageId::new(1)).unwrap();
    map.remove(MessageId::new(1)).unwrap();

    assert_eq!(meters.insert.snapshot().count, 2);
    assert_eq!(meters.remove.snapshot().count, 2);
}

#[test]
fn test_map_from_json_config() {
    let config = IndexConfig::from_json(r#"{ "viewer": true, "impression_respected_level": 5 }"#)
        .unwrap();
    let map = SearchableMessageMap::new(config);
    assert!(map.config().viewer);
    assert_eq!(map.config().impression_respected_level, 5);
    assert!(map.is_empty());
}
