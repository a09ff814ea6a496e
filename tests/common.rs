#![allow(dead_code)]

use aws_sdk_dynamodb::{
    types::{
        AttributeDefinition, KeySchemaElement, KeyType, ProvisionedThroughput,
        ScalarAttributeType,
    },
    Client,
};
use chrono::{Duration, TimeZone, Utc};
use single_table_dynamodb::{AttributeValue, Item, KeySchema, MemoryStore, Store, Table};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn memory_table() -> Table<MemoryStore> {
    init_logging();
    Table::new(MemoryStore::new()).with_consistent_read(true)
}

/// Create `count` videos in partition `pk`, one second apart, and return their sort keys
/// oldest first
pub async fn seed_videos<S: Store>(table: &Table<S>, pk: &str, count: usize) -> Vec<String> {
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .expect("valid start time");

    let mut sort_keys = Vec::with_capacity(count);

    for i in 0..count {
        let at = start + Duration::seconds(i as i64);
        let sk = table
            .key_scheme()
            .generate_sort_key_at("VIDEO", at)
            .expect("Failed to generate sort key");

        let item = Item::new((pk, sk.as_str()), &KeySchema::default())
            .with("title", AttributeValue::S(format!("video {i}")))
            .with("views", AttributeValue::N((i * 10).to_string()));

        table
            .item()
            .create(item, false)
            .execute()
            .await
            .expect("Failed to seed video");

        sort_keys.push(sk);
    }

    sort_keys
}

pub fn sort_keys(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.get_s("sk"))
        .map(String::from)
        .collect()
}

pub async fn create_table(client: &Client, table_name: &str) {
    let _ = client.delete_table().table_name(table_name).send().await;

    client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("pk")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .expect("Failed to build attribute definition"),
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("sk")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .expect("Failed to build attribute definition"),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("pk")
                .key_type(KeyType::Hash)
                .build()
                .expect("Failed to build key schema element"),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("sk")
                .key_type(KeyType::Range)
                .build()
                .expect("Failed to build key schema element"),
        )
        .provisioned_throughput(
            ProvisionedThroughput::builder()
                .read_capacity_units(5)
                .write_capacity_units(5)
                .build()
                .expect("Failed to build provisioned throughput"),
        )
        .send()
        .await
        .expect("Failed to create table");
}

#[macro_export]
macro_rules! assert_err {
    ($cond:expr,) => {
        $crate::assert_err!($cond);
    };
    ($cond:expr) => {
        match $cond {
            Ok(t) => {
                panic!("assertion failed, expected Err(..), got Ok({:?})", t);
            },
            Err(e) => e,
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        match $cond {
            Ok(t) => {
                panic!("assertion failed, expected Err(..), got Ok({:?}): {}", t, format_args!($($arg)+));
            },
            Err(e) => e,
        }
    };
}

#[macro_export]
macro_rules! assert_none {
    ($cond:expr,) => {
        $crate::assert_none!($cond);
    };
    ($cond:expr) => {
        match $cond {
            Some(t) => {
                panic!("assertion failed, expected None, got Some({:?})", t);
            },
            None => (),
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        match $cond {
            Some(t) => {
                panic!("assertion failed, expected None, got Some({:?}): {}", t, format_args!($($arg)+));
            },
            None => (),
        }
    };
}
