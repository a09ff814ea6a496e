use single_table_dynamodb::{
    errors::QueryError, AttributeValue, Condition, Item, KeySchema, PageToken, SortKeyCondition,
};

mod common;

#[tokio::test]
async fn test_query_pages_newest_first() {
    let table = common::memory_table();
    let mut sort_keys = common::seed_videos(&table, "u1", 5).await;
    common::seed_videos(&table, "u2", 3).await;
    sort_keys.reverse();

    let first = table
        .query("u1")
        .page_size(2)
        .execute()
        .await
        .expect("Failed to query");
    assert_eq!(common::sort_keys(&first.items), sort_keys[0..2]);
    assert!(first.next.is_some());

    let second = table
        .query("u1")
        .page_size(2)
        .start_from(first.next)
        .execute()
        .await
        .expect("Failed to query");
    assert_eq!(common::sort_keys(&second.items), sort_keys[2..4]);
    assert!(second.next.is_some());

    let third = table
        .query("u1")
        .page_size(2)
        .start_from(second.next)
        .execute()
        .await
        .expect("Failed to query");
    assert_eq!(common::sort_keys(&third.items), sort_keys[4..5]);
    assert!(third.is_last());
}

#[tokio::test]
async fn test_query_oldest_first() {
    let table = common::memory_table();
    let sort_keys = common::seed_videos(&table, "u1", 3).await;

    let page = table
        .query("u1")
        .oldest_first()
        .execute()
        .await
        .expect("Failed to query");

    assert_eq!(common::sort_keys(&page.items), sort_keys);
    assert!(page.is_last());
}

#[tokio::test]
async fn test_query_default_page_size() {
    let table = common::memory_table();
    common::seed_videos(&table, "u1", 35).await;

    let page = table.query("u1").execute().await.expect("Failed to query");

    assert_eq!(page.len(), 30);
    assert!(!page.is_last());
}

#[tokio::test]
async fn test_query_empty_partition() {
    let table = common::memory_table();

    let page = table.query("nobody").execute().await.expect("Failed to query");

    assert!(page.is_empty());
    assert!(page.is_last());
}

#[tokio::test]
async fn test_query_by_entity_type() {
    let table = common::memory_table();
    common::seed_videos(&table, "u1", 2).await;

    let post_sk = table.generate_sort_key("POST").expect("Failed to generate");
    table
        .item()
        .create(
            Item::new(("u1", post_sk.as_str()), &KeySchema::default())
                .with("body", AttributeValue::S("hello".into())),
            false,
        )
        .execute()
        .await
        .expect("Failed to create post");

    let posts = table
        .query("u1")
        .entity_type("POST")
        .expect("Unknown entity type")
        .execute()
        .await
        .expect("Failed to query");
    assert_eq!(common::sort_keys(&posts.items), [post_sk]);

    let videos = table
        .query("u1")
        .sort_key(SortKeyCondition::begins_with("vid#"))
        .execute()
        .await
        .expect("Failed to query");
    assert_eq!(videos.len(), 2);
}

#[tokio::test]
async fn test_query_sort_key_range() {
    let table = common::memory_table();
    let sort_keys = common::seed_videos(&table, "u1", 5).await;

    let page = table
        .query("u1")
        .sort_key(SortKeyCondition::between(&sort_keys[1], &sort_keys[3]))
        .oldest_first()
        .execute()
        .await
        .expect("Failed to query");

    assert_eq!(common::sort_keys(&page.items), sort_keys[1..4]);
}

#[tokio::test]
async fn test_query_filter_counts_against_page_size() {
    let table = common::memory_table();
    common::seed_videos(&table, "u1", 5).await;

    // views are 0, 10, 20, 30, 40 oldest first
    let page = table
        .query("u1")
        .page_size(3)
        .filter(Condition::ge("views", AttributeValue::N("35".into())))
        .execute()
        .await
        .expect("Failed to query");
    assert_eq!(page.len(), 1);
    assert_eq!(page.items[0].get_s("title"), Some("video 4"));
    assert!(page.next.is_some());

    let rest = table
        .query("u1")
        .page_size(3)
        .filter(Condition::ge("views", AttributeValue::N("35".into())))
        .start_from(page.next)
        .execute()
        .await
        .expect("Failed to query");
    assert!(rest.is_empty());
    assert!(rest.is_last());
}

#[tokio::test]
async fn test_query_projection() {
    let table = common::memory_table();
    common::seed_videos(&table, "u1", 2).await;

    let page = table
        .query("u1")
        .attribute("title")
        .attributes(["sk"])
        .execute()
        .await
        .expect("Failed to query");

    assert_eq!(page.len(), 2);
    for item in page {
        assert_eq!(item.len(), 2);
        assert!(item.contains("title"));
        assert!(item.contains("sk"));
    }
}

#[tokio::test]
async fn test_scan_pages_through_table() {
    let table = common::memory_table();
    common::seed_videos(&table, "u1", 3).await;
    common::seed_videos(&table, "u2", 2).await;

    let mut seen = Vec::new();
    let mut token: Option<PageToken> = None;
    let mut pages = 0;

    loop {
        let page = table
            .scan()
            .page_size(2)
            .start_from(token)
            .execute()
            .await
            .expect("Failed to scan");
        pages += 1;

        seen.extend(page.items.iter().filter_map(|item| item.key(&KeySchema::default())));

        if page.is_last() {
            break;
        }
        token = page.next;
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 5);
    seen.dedup();
    assert_eq!(seen.len(), 5);
}

#[tokio::test]
async fn test_scan_filter() {
    let table = common::memory_table();
    common::seed_videos(&table, "u1", 3).await;
    common::seed_videos(&table, "u2", 3).await;

    let page = table
        .scan()
        .filter(Condition::eq("title", AttributeValue::S("video 1".into())))
        .execute()
        .await
        .expect("Failed to scan");

    assert_eq!(page.len(), 2);
    assert!(page.is_last());
}

#[tokio::test]
async fn test_token_passes_through_outer_apis() {
    let table = common::memory_table();
    common::seed_videos(&table, "u1", 3).await;

    let first = table
        .query("u1")
        .page_size(1)
        .execute()
        .await
        .expect("Failed to query");

    let encoded = first
        .next
        .as_ref()
        .expect("Expected a token")
        .encode()
        .expect("Failed to encode");
    let decoded = PageToken::decode(&encoded).expect("Failed to decode");
    assert_eq!(Some(&decoded), first.next.as_ref());

    let second = table
        .query("u1")
        .page_size(1)
        .start_from(decoded)
        .execute()
        .await
        .expect("Failed to query");
    assert_ne!(
        common::sort_keys(&first.items),
        common::sort_keys(&second.items)
    );

    let err = assert_err!(PageToken::decode("%%%"));
    assert!(matches!(err, QueryError::InvalidPageToken(_)));
}
