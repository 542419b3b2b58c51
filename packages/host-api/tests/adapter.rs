use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use webext_host_api::prelude::*;
use webext_host_api::test::MockHost;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn tabs_metadata() -> ApiMetadata {
    ApiMetadata::builder()
        .method("create", MethodMetadata::new(1, 1))
        .method("discard", MethodMetadata::new(0, 1).fallback_to_no_callback())
        .method("query", MethodMetadata::new(1, 1))
        .build()
}

#[tokio::test]
async fn test_arity_then_single_value_resolution() {
    init_tracing();
    let host = MockHost::new();
    let tabs = host
        .namespace("tabs")
        .method("create", |args| Ok(vec![json!({"id": 9, "url": args[0]["url"]})]));
    let adapter = ApiAdapter::new(Arc::new(host.clone()));
    let api = adapter.get_proxy_api("tabs", &tabs_metadata()).unwrap();

    let err = api.invoke("create", vec![]).await.unwrap_err();
    assert!(matches!(err, HostApiError::Arity { got: 0, .. }));
    assert!(tabs.calls("create").is_empty());

    let created = api
        .invoke("create", vec![json!({"url": "https://a.test/"})])
        .await
        .unwrap();
    assert_eq!(created, json!({"id": 9, "url": "https://a.test/"}));
}

#[tokio::test]
async fn test_fallback_transition_is_shared_by_later_calls() {
    init_tracing();
    let host = MockHost::new();
    let tabs = host
        .namespace("tabs")
        .method_without_callback("discard", |_| Ok(vec![]));
    let metadata = tabs_metadata();
    let adapter = ApiAdapter::new(Arc::new(host.clone()));
    let api = adapter.get_proxy_api("tabs", &metadata).unwrap();

    assert_eq!(api.invoke("discard", vec![json!(1)]).await.unwrap(), Value::Null);

    let spec = metadata.method("discard").unwrap().spec();
    assert!(spec.no_callback);
    assert!(!spec.fallback_to_no_callback);

    // A fresh proxy over the same table skips the probe as well.
    let again = adapter.get_proxy_api("tabs", &metadata).unwrap();
    again.invoke("discard", vec![json!(2)]).await.unwrap();

    let forms: Vec<bool> = tabs
        .calls("discard")
        .into_iter()
        .map(|call| call.with_callback)
        .collect();
    assert_eq!(forms, vec![true, false, false]);
}

#[tokio::test]
async fn test_last_error_rejects_with_host_message() {
    let host = MockHost::new();
    host.namespace("tabs")
        .method("query", |_| Err("Invalid url pattern".to_string()));
    let adapter = ApiAdapter::new(Arc::new(host.clone()));
    let api = adapter.get_proxy_api("tabs", &tabs_metadata()).unwrap();

    let err = api.invoke("query", vec![json!({"url": "::"})]).await.unwrap_err();
    assert!(err.is_runtime());
    assert_eq!(err.to_string(), "Invalid url pattern");
    assert_eq!(host.last_error().message(), None);
}

#[test]
fn test_property_identity_is_stable() {
    let host = MockHost::new();
    host.namespace("tabs").method("query", |_| Ok(vec![]));
    let adapter = ApiAdapter::new(Arc::new(host));
    let api = adapter.get_proxy_api("tabs", &tabs_metadata()).unwrap();

    let first = api.get_property("query").unwrap();
    let second = api.get_property("query").unwrap();
    assert!(first.as_method().unwrap().ptr_eq(second.as_method().unwrap()));
}

#[tokio::test]
async fn test_arity_bounds_hold_for_every_count() {
    let host = MockHost::new();
    let ns = host
        .namespace("windows")
        .method("update", |args| Ok(vec![args[1].clone()]));
    let metadata = ApiMetadata::builder()
        .method("update", MethodMetadata::new(2, 2))
        .build();
    let adapter = ApiAdapter::new(Arc::new(host.clone()));
    let api = adapter.get_proxy_api("windows", &metadata).unwrap();

    for count in 0..5usize {
        let args = vec![json!(1); count];
        let outcome = api.invoke("update", args).await;
        if count == 2 {
            assert_eq!(outcome.unwrap(), json!(1));
        } else {
            assert!(matches!(outcome, Err(HostApiError::Arity { .. })));
        }
    }
    assert_eq!(ns.calls("update").len(), 1);
}

#[tokio::test]
async fn test_promise_native_host_is_not_wrapped() {
    let host = MockHost::promise_native();
    let tabs = host
        .namespace("tabs")
        .method("create", |_| Ok(vec![json!({"id": 1})]));
    let adapter = ApiAdapter::new(Arc::new(host.clone()));
    let api = adapter.get_proxy_api("tabs", &tabs_metadata()).unwrap();

    // No arity checking on native hosts: the host itself validates.
    assert_eq!(api.invoke("create", vec![]).await.unwrap(), json!({"id": 1}));
    assert!(!tabs.calls("create")[0].with_callback);
    assert_eq!(adapter.convention().unwrap(), CallConvention::Promise);
}
