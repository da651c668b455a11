//! Integration tests for reading, writing and caching typed options

mod common;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{context, memory_database, raw_value, row_count, write_raw};
use optstore::{
    ConfigOption, IsolationLevel, OptionError, OptionResult, OptionsContext, Resolve,
    TransformError, Transformer, UnitOfWork,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

optstore::option_enum! {
    enum Theme { Light, Dark }
}

#[tokio::test]
async fn test_set_then_value() {
    let context = context().await;
    let foo = context.declare::<i32>("foo").unwrap();

    foo.set(42).await.unwrap();

    assert_eq!(foo.value().await.unwrap(), 42);
    assert_eq!(raw_value(context.database(), "foo").await, Some(Some("42".to_string())));
}

#[tokio::test]
async fn test_unset_required_value_fails() {
    let context = context().await;
    let foo = context.declare::<i32>("foo").unwrap();

    let err = foo.value().await.unwrap_err();
    assert!(matches!(err, OptionError::RequiredMissing { ref key } if key == "foo"));
    assert_eq!(err.to_string(), "Required option foo is not set in database");
}

#[tokio::test]
async fn test_get_or_null_then_set() {
    let context = context().await;
    let foo = context.declare::<i32>("foo").unwrap();

    let value = match foo.get_or_null().await.unwrap() {
        Some(value) => value,
        None => foo.set(5).await.unwrap().value().await.unwrap(),
    };

    assert_eq!(value, 5);
    assert_eq!(foo.get_or_throw().await.unwrap(), 5);
}

#[tokio::test]
async fn test_get_or_null_never_creates_row() {
    let context = context().await;
    let foo = context.declare::<String>("foo").unwrap();

    assert_eq!(foo.get_or_null().await.unwrap(), None);
    assert_eq!(row_count(context.database()).await, 0);
}

#[tokio::test]
async fn test_get_or_set_prefers_stored_value() {
    let context = context().await;
    let foo = context.declare::<String>("foo").unwrap();

    foo.set("foo".to_string()).await.unwrap();

    assert_eq!(foo.get_or_set("bar".to_string()).await.unwrap(), "foo");
    assert_eq!(raw_value(context.database(), "foo").await, Some(Some("foo".to_string())));
}

#[tokio::test]
async fn test_get_or_set_writes_default() {
    let context = context().await;
    let foo = context.declare::<String>("foo").unwrap();

    assert_eq!(foo.get_or_set("bar".to_string()).await.unwrap(), "bar");
    assert_eq!(raw_value(context.database(), "foo").await, Some(Some("bar".to_string())));
    assert_eq!(foo.value().await.unwrap(), "bar");
}

#[tokio::test]
async fn test_get_or_set_null_default_creates_no_row() {
    let context = context().await;
    let foo = context.option::<Option<String>>("foo").or_null().declare().unwrap();

    assert_eq!(foo.get_or_set(None).await.unwrap(), None);
    assert_eq!(row_count(context.database()).await, 0);

    foo.set(Some("kept".to_string())).await.unwrap();
    assert_eq!(foo.get_or_set(None).await.unwrap(), Some("kept".to_string()));
}

#[tokio::test]
async fn test_nullable_set_null_stores_null_row() {
    let context = context().await;
    let foo = context.option::<Option<i64>>("foo").or_null().declare().unwrap();

    foo.set(None).await.unwrap();

    assert_eq!(raw_value(context.database(), "foo").await, Some(None));
    assert_eq!(foo.get_or_null().await.unwrap(), None);
    assert_eq!(foo.value().await.unwrap(), None);
}

#[tokio::test]
async fn test_null_row_reads_as_missing_for_required_option() {
    let context = context().await;
    write_raw(context.database(), "foo", None).await;
    let foo = context.declare::<i32>("foo").unwrap();

    assert!(foo.value().await.unwrap_err().is_required_missing());
    assert!(matches!(
        foo.get_or_throw().await,
        Err(OptionError::RequiredMissing { .. })
    ));
}

#[tokio::test]
async fn test_malformed_text_fails_at_read_time() {
    let context = context().await;
    write_raw(context.database(), "foo", Some("not_a_number")).await;

    let foo = context.declare::<i32>("foo").unwrap();
    let err = foo.value().await.unwrap_err();

    match err {
        OptionError::Transform { key, source } => {
            assert_eq!(key, "foo");
            assert_eq!(source.input, "not_a_number");
        }
        other => panic!("expected transform error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cache_masks_external_writes_until_refresh() {
    let context = context().await;
    let foo = context.option::<i32>("foo").cache_forever().declare().unwrap();

    foo.set(42).await.unwrap();
    write_raw(context.database(), "foo", Some("44")).await;

    assert_eq!(foo.value().await.unwrap(), 42);
    assert_eq!(foo.get_or_null().await.unwrap(), Some(44));

    foo.refresh();
    assert_eq!(foo.value().await.unwrap(), 44);
}

#[tokio::test]
async fn test_cached_value_survives_closed_database() {
    let context = context().await;
    let cached = context.option::<i32>("cached").cache_forever().declare().unwrap();
    let uncached = context.declare::<i32>("uncached").unwrap();

    cached.set(42).await.unwrap();
    uncached.set(7).await.unwrap();
    context.database().close().await;

    assert_eq!(cached.value().await.unwrap(), 42);
    assert!(matches!(
        uncached.value().await,
        Err(OptionError::Database(_))
    ));
}

#[tokio::test]
async fn test_clones_share_cache() {
    let context = context().await;
    let foo = context.option::<i32>("foo").cache_forever().declare().unwrap();
    let clone = foo.clone();

    foo.set(1).await.unwrap();
    write_raw(context.database(), "foo", Some("2")).await;

    assert_eq!(clone.value().await.unwrap(), 1);
}

#[tokio::test]
async fn test_cached_reads_skip_transformer() {
    let context = context().await;
    let wraps = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wraps);
    let transformer = Transformer::new(
        |value: &i64| value.to_string(),
        move |raw: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            raw.parse::<i64>().map_err(|e| TransformError::new::<i64>(raw, e))
        },
    );

    let foo = context
        .option::<i64>("foo")
        .transformer(transformer)
        .cache_forever()
        .declare()
        .unwrap();

    write_raw(context.database(), "foo", Some("10")).await;
    for _ in 0..3 {
        assert_eq!(foo.value().await.unwrap(), 10);
    }
    assert_eq!(wraps.load(Ordering::SeqCst), 1);

    foo.set(11).await.unwrap();
    assert_eq!(foo.value().await.unwrap(), 11);
    assert_eq!(wraps.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_options_bind_to_their_own_database() {
    let context = context().await;
    let other = memory_database("other").await;

    let here = context.declare::<i32>("foo").unwrap();
    let there = context
        .option::<i32>("foo")
        .database(other.clone())
        .declare()
        .unwrap();

    here.set(5).await.unwrap();
    there.set(6).await.unwrap();

    assert_eq!(here.value().await.unwrap(), 5);
    assert_eq!(there.value().await.unwrap(), 6);
    assert_eq!(raw_value(&other, "foo").await, Some(Some("6".to_string())));
}

#[tokio::test]
async fn test_or_set_rule_writes_default_on_first_read() {
    let context = context().await;
    let retries = context.option::<u32>("retries").or_set(3).declare().unwrap();

    assert_eq!(retries.value().await.unwrap(), 3);
    assert_eq!(raw_value(context.database(), "retries").await, Some(Some("3".to_string())));

    retries.set(9).await.unwrap();
    assert_eq!(retries.value().await.unwrap(), 9);
}

struct ZeroWhenUnset;

#[async_trait]
impl Resolve<i32> for ZeroWhenUnset {
    async fn resolve(&self, option: &ConfigOption<i32>, uow: &mut UnitOfWork) -> OptionResult<i32> {
        Ok(option.get_or_null_in(uow).await?.unwrap_or(0))
    }
}

#[tokio::test]
async fn test_custom_rule() {
    let context = context().await;
    let foo = context
        .option::<i32>("foo")
        .resolve(ZeroWhenUnset)
        .declare()
        .unwrap();

    assert_eq!(foo.value().await.unwrap(), 0);
    assert_eq!(row_count(context.database()).await, 0);

    foo.set(8).await.unwrap();
    assert_eq!(foo.value().await.unwrap(), 8);
}

#[tokio::test]
async fn test_enum_stored_by_exact_name() {
    let context = context().await;
    let theme = context.declare::<Theme>("theme").unwrap();

    theme.set(Theme::Dark).await.unwrap();
    assert_eq!(raw_value(context.database(), "theme").await, Some(Some("Dark".to_string())));
    assert_eq!(theme.value().await.unwrap(), Theme::Dark);

    write_raw(context.database(), "theme", Some("dark")).await;
    assert!(matches!(
        theme.get_or_throw().await,
        Err(OptionError::Transform { .. })
    ));
}

#[tokio::test]
async fn test_date_round_trip() {
    let context = context().await;
    let since = context.declare::<NaiveDate>("since").unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    since.set(date).await.unwrap();

    assert_eq!(raw_value(context.database(), "since").await, Some(Some("2024-03-01".to_string())));
    assert_eq!(since.value().await.unwrap(), date);
}

#[tokio::test]
async fn test_immediate_isolation() {
    let context = context().await;
    let foo = context
        .option::<bool>("foo")
        .isolation(IsolationLevel::Immediate)
        .declare()
        .unwrap();

    let uow = foo.begin().await.unwrap();
    assert_eq!(uow.isolation(), IsolationLevel::Immediate);
    uow.commit().await.unwrap();

    foo.set(true).await.unwrap();
    assert!(foo.value().await.unwrap());
}

#[tokio::test]
async fn test_primitives_share_one_unit_of_work() {
    let context = context().await;
    let foo = context.declare::<i32>("foo").unwrap();

    let mut uow = foo.begin().await.unwrap();
    foo.store_in(&mut uow, &3).await.unwrap();
    assert_eq!(foo.get_or_throw_in(&mut uow).await.unwrap(), 3);
    uow.rollback().await.unwrap();

    assert_eq!(foo.get_or_null().await.unwrap(), None);
}

#[tokio::test]
async fn test_contexts_are_independent() {
    let first = context().await;
    let second = OptionsContext::new(memory_database("second").await);

    first.declare::<i32>("foo").unwrap();

    assert_eq!(first.store().required_keys(), vec!["foo"]);
    assert!(second.store().required_keys().is_empty());
}
