//! Integration tests for required-option tracking and validation

mod common;

use common::{context, raw_value, write_raw};
use optstore::OptionError;

#[tokio::test]
async fn test_check_passes_when_everything_is_set() {
    let context = context().await;
    let host = context.declare::<String>("host").unwrap();
    let port = context.declare::<u16>("port").unwrap();

    host.set("localhost".to_string()).await.unwrap();
    port.set(8080).await.unwrap();

    context.check_required().await.unwrap();
}

#[tokio::test]
async fn test_aggregate_names_exactly_the_missing_keys() {
    let context = context().await;
    context.declare::<String>("alpha").unwrap();
    let beta = context.declare::<String>("beta").unwrap();
    context.declare::<i32>("gamma").unwrap();

    beta.set("set".to_string()).await.unwrap();

    let err = context.check_required().await.unwrap_err();
    match &err {
        OptionError::RequiredMissingAggregate { keys } => {
            assert_eq!(keys, &vec!["alpha".to_string(), "gamma".to_string()]);
        }
        other => panic!("expected aggregate error, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Required options alpha, gamma are not set in database"
    );
}

#[tokio::test]
async fn test_transform_failure_propagates() {
    let context = context().await;
    context.declare::<String>("missing").unwrap();
    context.declare::<i32>("broken").unwrap();
    write_raw(context.database(), "broken", Some("x")).await;

    let err = context.check_required().await.unwrap_err();
    assert!(matches!(err, OptionError::Transform { ref key, .. } if key == "broken"));
}

#[tokio::test]
async fn test_nullable_options_are_not_checked() {
    let context = context().await;
    context
        .option::<Option<String>>("optional")
        .or_null()
        .declare()
        .unwrap();

    assert!(context.store().required_keys().is_empty());
    context.check_required().await.unwrap();
}

#[tokio::test]
async fn test_or_set_rule_satisfies_check() {
    let context = context().await;
    context.option::<u32>("retries").or_set(3).declare().unwrap();

    assert_eq!(context.store().required_keys(), vec!["retries"]);
    context.check_required().await.unwrap();
    assert_eq!(raw_value(context.database(), "retries").await, Some(Some("3".to_string())));
}

#[tokio::test]
async fn test_cached_option_with_missing_row_is_reported() {
    let context = context().await;
    let token = context.option::<String>("token").cache_forever().declare().unwrap();

    token.set("abc".to_string()).await.unwrap();
    sqlx::query("DELETE FROM options")
        .execute(context.database().pool())
        .await
        .unwrap();
    assert_eq!(token.value().await.unwrap(), "abc");

    let err = context.check_required().await.unwrap_err();
    assert!(matches!(
        err,
        OptionError::RequiredMissingAggregate { ref keys } if keys == &vec!["token".to_string()]
    ));
}

#[tokio::test]
async fn test_clear_required() {
    let context = context().await;
    context.declare::<String>("alpha").unwrap();
    assert_eq!(context.store().required_count(), 1);

    context.clear_required();

    assert_eq!(context.store().required_count(), 0);
    context.check_required().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_declarations_are_both_tracked() {
    let context = context().await;
    context.declare::<String>("alpha").unwrap();
    context.declare::<String>("alpha").unwrap();

    assert_eq!(context.store().required_keys(), vec!["alpha", "alpha"]);

    let err = context.check_required().await.unwrap_err();
    assert!(matches!(
        err,
        OptionError::RequiredMissingAggregate { ref keys } if keys.len() == 2
    ));
}
