#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use webext_host_api::test::MockHost;
use webext_sdk::{Browser, SdkConfig};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A callback-last host with the namespaces the scenario tests touch.
pub fn scripted_host() -> MockHost {
    let host = MockHost::new();

    host.namespace("notifications")
        .method("create", |args| Ok(vec![args[0].clone()]))
        .method("clear", |_| Ok(vec![json!(true)]))
        .event("onClicked");

    let storage = host.namespace("storage").event("onChanged");
    for area in ["local", "sync"] {
        storage
            .namespace(area)
            .method("get", |_| Ok(vec![json!({})]))
            .method("set", |_| Ok(vec![]));
    }

    host.namespace("windows")
        .method("get", |args| Ok(vec![json!({"id": args[0], "state": "normal", "focused": true})]))
        .method("update", |args| {
            let mut window = json!({"id": args[0], "state": "normal"});
            if let Some(state) = args[1].get("state") {
                window["state"] = state.clone();
            }
            Ok(vec![window])
        });

    host
}

pub fn browser(host: &MockHost) -> Browser {
    Browser::new(Arc::new(host.clone()))
}

pub fn browser_with_config(host: &MockHost, config: SdkConfig) -> Browser {
    Browser::with_config(Arc::new(host.clone()), config)
}

pub fn with_callback_forms(host: &MockHost, namespace: &str, method: &str) -> Vec<bool> {
    host.namespace(namespace)
        .calls(method)
        .into_iter()
        .map(|call| call.with_callback)
        .collect::<Vec<_>>()
}

pub fn args_of(host: &MockHost, namespace: &str, method: &str, index: usize) -> Vec<Value> {
    host.namespace(namespace).calls(method)[index].args.clone()
}
