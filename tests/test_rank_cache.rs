use std::io::Cursor;

use plo_equity::cards::*;
use plo_equity::error::PloError;
use plo_equity::hand_value::{evaluate_five, HandCategory};
use plo_equity::rank_cache::*;

fn rank(notation: &str) -> u32 {
    RankCache::shared().rank_str(notation).unwrap()
}

fn five(notation: &str) -> [Card; 5] {
    parse_cards(notation).unwrap().try_into().unwrap()
}

#[test]
fn test_quads_order() {
    assert!(rank("AsAhAdAc5s") < rank("KsKhKdKc5s"));
    assert!(rank("AsAhAdAcKs") < rank("AsAhAdAc5s"));
}

#[test]
fn test_extremes() {
    let cache = RankCache::shared();
    assert_eq!(rank("AhKhQhJhTh"), 1);
    assert_eq!(rank("KdQdJdTd9d"), 2);
    assert_eq!(cache.worst_rank(), 7462);
    assert_eq!(rank("7c5d4h3s2s"), 7462);
}

#[test]
fn test_wheel_straight_flush() {
    assert_eq!(rank("2s3s4s5sAs"), 10);
    assert_eq!(evaluate_five(&five("2s3s4s5sAs")).category, HandCategory::StraightFlush);
    assert!(rank("2s3s4s5s6s") < rank("2s3s4s5sAs"));
    assert!(rank("2s3s4s5sAs") < rank("AsAhAdAcKs"));
}

#[test]
fn test_wheel_is_lowest_straight() {
    assert!(rank("6s5h4d3c2s") < rank("5s4h3d2cAs"));
    assert!(rank("5s4h3d2cAs") < rank("AsAhAdKcQs"));
}

#[test]
fn test_category_boundaries() {
    assert!(rank("2s2h2d3c3s") < rank("AsKsQsJs9s"));
    assert!(rank("2s3s4s5s7s") < rank("AsKhQdJcTs"));
    assert!(rank("6s5h4d3c2s") < rank("AsAhAdKcQs"));
    assert!(rank("2s2h2d4c3s") < rank("AsAhKdKcQs"));
    assert!(rank("3s3h2d2cAs") < rank("AsAhKdQcJs"));
    assert!(rank("2s2h5d4c3s") < rank("AsKhQdJc9s"));
}

#[test]
fn test_equal_strength_shares_rank() {
    assert_eq!(rank("AsKsQsJs9s"), rank("AhKhQhJh9h"));
    assert_eq!(rank("AsKhQdJc9s"), rank("AhKsQcJd9h"));
    assert_eq!(rank("KsKh8d7c2s"), rank("KdKc8s7h2h"));
}

#[test]
fn test_table_size() {
    assert_eq!(RankCache::shared().len(), 99_554);
}

#[test]
fn test_rank_validates_input() {
    let cache = RankCache::shared();
    assert!(matches!(
        cache.rank_str("AsKsQs"),
        Err(PloError::InvalidHandSize { expected: 5, got: 3, .. })
    ));
    assert!(matches!(cache.rank_str("AsAsQsJsTs"), Err(PloError::DuplicateCard { .. })));
    assert!(cache.rank_str("AsKsQsJsXs").is_err());
}

#[test]
fn test_missing_key_is_fatal() {
    let empty = RankCache::default();
    let err = empty.rank(&five("AsKsQsJsTs")).unwrap_err();
    assert!(matches!(err, PloError::HandNotFound(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_text_round_trip() {
    let cache = RankCache::shared();
    let mut buf = Vec::new();
    cache.write_to(&mut buf).unwrap();
    let text = String::from_utf8(buf.clone()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(TABLE_HEADER));
    assert_eq!(lines.next(), Some("AsKsQsJsTs,1,Royal Flush"));

    let loaded = RankCache::from_reader(Cursor::new(buf)).unwrap();
    assert_eq!(loaded.len(), cache.len());
    for hand in ["AsAhAdAc5s", "7c5d4h3s2s", "KsKh8d7c2s", "2s3s4s5sAs", "QhJh9h5h2h"] {
        assert_eq!(loaded.rank_str(hand).unwrap(), cache.rank_str(hand).unwrap());
    }
}

#[test]
fn test_reader_accepts_two_columns() {
    let text = "normalized_hand,hand_rank\nAsKsQsJsTs,1\n\nKsQsJsTs9s,2\n";
    let cache = RankCache::from_reader(Cursor::new(text)).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.rank(&five("KdQdJdTd9d")).unwrap(), 2);
}

#[test]
fn test_malformed_rows_report_line() {
    let bad_rank = "normalized_hand,hand_rank\nAsKsQsJsTs,1\nKsQsJsTs9s,abc\n";
    match RankCache::from_reader(Cursor::new(bad_rank)) {
        Err(PloError::MalformedTable { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected malformed table, got {:?}", other.map(|c| c.len())),
    }

    let short_key = "normalized_hand,hand_rank\nAsKs,1\n";
    assert!(matches!(
        RankCache::from_reader(Cursor::new(short_key)),
        Err(PloError::MalformedTable { line: 2, .. })
    ));

    let no_rank = "normalized_hand,hand_rank\nAsKsQsJsTs\n";
    let err = RankCache::from_reader(Cursor::new(no_rank)).unwrap_err();
    assert!(err.is_fatal());

    let zero = "normalized_hand,hand_rank\nAsKsQsJsTs,0\n";
    assert!(RankCache::from_reader(Cursor::new(zero)).is_err());
}
