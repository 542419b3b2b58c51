mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use webext_sdk::config::NotificationDefaults;
use webext_sdk::prelude::*;

#[test]
fn test_id_or_title_is_required() {
    common::init_tracing();
    let host = common::scripted_host();
    let browser = common::browser(&host);

    let err = Notification::new(&browser, None, &json!({"message": "no title"}))
        .err()
        .unwrap();
    assert!(matches!(err, ExtensionError::Validation(_)));

    let err = Notification::new(&browser, Some(""), &json!({})).err().unwrap();
    assert!(matches!(err, ExtensionError::Validation(_)));

    let titled = Notification::new(&browser, None, &json!({"title": "X"})).unwrap();
    assert_eq!(titled.id(), "X");
    assert_eq!(titled.template_type(), TemplateType::Basic);
}

#[tokio::test]
async fn test_configured_defaults_reach_the_host() {
    let host = common::scripted_host();
    let config = SdkConfig {
        notifications: NotificationDefaults {
            default_type: TemplateType::Basic,
            default_icon_url: Some("icons/48.png".to_string()),
        },
        ..SdkConfig::default()
    };
    let browser = common::browser_with_config(&host, config);

    let shown = Notification::create(&browser, Some("build"), &json!({"title": "Done"}))
        .await
        .unwrap();
    assert_eq!(shown.id(), "build");

    assert_eq!(
        common::args_of(&host, "notifications", "create", 0),
        vec![
            json!("build"),
            json!({"type": "basic", "title": "Done", "iconUrl": "icons/48.png"})
        ]
    );
    assert!(shown.clear().await.unwrap());
}

#[test]
fn test_instance_listener_filters_by_id() {
    let host = common::scripted_host();
    let browser = common::browser(&host);
    let mine = Notification::new(&browser, Some("mine"), &json!({})).unwrap();

    let clicks = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&clicks);
    mine.add_event_listener("clicked", move |_| *counter.lock().unwrap() += 1)
        .unwrap();

    let notifications = host.namespace("notifications");
    notifications.emit("onClicked", vec![json!("other")]);
    notifications.emit("onClicked", vec![json!("mine")]);

    assert_eq!(*clicks.lock().unwrap(), 1);

    let err = mine.add_event_listener("closed", |_| {}).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Your browser does not support 'closed' events."
    );
}
