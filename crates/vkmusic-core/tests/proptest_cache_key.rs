use proptest::prelude::*;
use vkmusic_core::catalog::{normalize_query, SearchParams};

fn key(query: &str) -> String {
    SearchParams::new(normalize_query(query), 5, "5.131").cache_key()
}

proptest! {
    /// Normalizing twice changes nothing.
    #[test]
    fn normalize_is_idempotent(s in "[a-zA-Zа-яА-ЯёЁ0-9 \t\n]{0,40}") {
        let once = normalize_query(&s);
        prop_assert_eq!(normalize_query(&once), once);
    }

    /// Case and spacing variants of one query share a cache key.
    #[test]
    fn case_and_spacing_share_key(
        words in proptest::collection::vec("[a-zA-Zа-яА-Я0-9]{1,8}", 1..5),
        gap in "[ \t]{1,3}",
        upper in proptest::bool::ANY,
    ) {
        let plain = words.join(" ");
        let mut variant = format!("  {}  ", words.join(&gap));
        if upper {
            variant = variant.to_uppercase();
        }
        prop_assert_eq!(key(&plain), key(&variant));
    }

    /// Different normalized queries never collide.
    #[test]
    fn distinct_queries_get_distinct_keys(
        a in "[a-z0-9\"\\\\:,{} ]{1,20}",
        b in "[a-z0-9\"\\\\:,{} ]{1,20}",
    ) {
        prop_assume!(normalize_query(&a) != normalize_query(&b));
        prop_assert_ne!(key(&a), key(&b));
    }
}

#[test]
fn test_key_covers_count_and_version() {
    let base = SearchParams::new("adele".to_string(), 5, "5.131");
    assert_ne!(
        base.cache_key(),
        SearchParams::new("adele".to_string(), 10, "5.131").cache_key()
    );
    assert_ne!(
        base.cache_key(),
        SearchParams::new("adele".to_string(), 5, "5.199").cache_key()
    );
}
