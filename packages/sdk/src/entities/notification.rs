use futures::future::try_join_all;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use webext_host_api::{ApiMetadata, MethodMetadata};

use super::base::{self, ExtensionClass};
use crate::browser::Browser;
use crate::error::{ExtensionError, Result};

static METADATA: Lazy<ApiMetadata> = Lazy::new(|| {
    ApiMetadata::builder()
        .method("clear", MethodMetadata::new(1, 1))
        .method("create", MethodMetadata::new(1, 2))
        .method("getAll", MethodMetadata::new(0, 0))
        .method("getPermissionLevel", MethodMetadata::new(0, 0))
        .method("update", MethodMetadata::new(2, 2))
        .build()
});

/// Options every template accepts.
const BASE_OPTIONS: [&str; 5] = ["title", "message", "iconUrl", "contextMessage", "buttons"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    #[default]
    Basic,
    Image,
    List,
    Progress,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Basic => "basic",
            TemplateType::Image => "image",
            TemplateType::List => "list",
            TemplateType::Progress => "progress",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "basic" => Ok(TemplateType::Basic),
            "image" => Ok(TemplateType::Image),
            "list" => Ok(TemplateType::List),
            "progress" => Ok(TemplateType::Progress),
            other => Err(ExtensionError::validation(format!(
                "Invalid notification type: {other}"
            ))),
        }
    }
}

/// The options sent to the host for a notification of `template`.
pub fn fields_for_type(template: TemplateType) -> Vec<&'static str> {
    let mut fields = BASE_OPTIONS.to_vec();
    match template {
        TemplateType::Basic => {}
        TemplateType::Image => fields.push("imageUrl"),
        TemplateType::List => fields.push("items"),
        TemplateType::Progress => fields.push("progress"),
    }
    fields
}

/// Which host method [`Notification::display`] goes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayAction {
    #[default]
    Create,
    Update,
}

impl DisplayAction {
    fn method_name(&self) -> &'static str {
        match self {
            DisplayAction::Create => "create",
            DisplayAction::Update => "update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationButton {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<NotificationButton>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<NotificationItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub template_type: Option<TemplateType>,
}

/// A desktop notification, identified by `id`.
#[derive(Clone)]
pub struct Notification {
    browser: Browser,
    id: String,
    info: NotificationInfo,
}

impl ExtensionClass for Notification {
    const CLASS_NAME: &'static str = "Notification";
    const API_NAME: &'static str = "notifications";
    const FIELDS: &'static [&'static str] = &[
        "buttons",
        "contextMessage",
        "eventTime",
        "iconUrl",
        "imageUrl",
        "items",
        "message",
        "priority",
        "progress",
        "requireInteraction",
        "silent",
        "title",
        "type",
    ];

    fn metadata() -> &'static ApiMetadata {
        &METADATA
    }
}

impl Notification {
    /// Build a notification without showing it.
    ///
    /// At least one of `id` and `options.title` is required; the id defaults to the title.
    /// The template type and icon default to the configured values.
    pub fn new(browser: &Browser, id: Option<&str>, options: &Value) -> Result<Self> {
        let id = id.filter(|id| !id.is_empty());
        let title = options
            .get("title")
            .and_then(Value::as_str)
            .filter(|title| !title.is_empty());

        if id.is_none() && title.is_none() {
            return Err(ExtensionError::validation(
                "Either 'id' or 'title' is required for notification creation",
            ));
        }

        if let Some(requested) = options.get("type").filter(|t| !t.is_null()) {
            match requested.as_str() {
                Some(name) => {
                    name.parse::<TemplateType>()?;
                }
                None => {
                    return Err(ExtensionError::validation(format!(
                        "Invalid notification type: {requested}"
                    )))
                }
            }
        }

        let defaults = &browser.config().notifications;
        let default_type = defaults.default_type;
        let mut info = NotificationInfo {
            icon_url: defaults.default_icon_url.clone(),
            template_type: Some(default_type),
            ..NotificationInfo::default()
        };
        base::project_fields(&mut info, Self::FIELDS, options)?;
        if info.template_type.is_none() {
            info.template_type = Some(default_type);
        }

        let id = match id {
            Some(id) => id.to_string(),
            None => info.title.clone().unwrap_or_default(),
        };

        Ok(Self {
            browser: browser.clone(),
            id,
            info,
        })
    }

    /// Build a notification and show it right away.
    pub async fn create(browser: &Browser, id: Option<&str>, options: &Value) -> Result<Self> {
        let mut notification = Self::new(browser, id, options)?;
        notification.display(None, DisplayAction::Create).await?;
        Ok(notification)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn info(&self) -> &NotificationInfo {
        &self.info
    }

    pub fn template_type(&self) -> TemplateType {
        self.info.template_type.unwrap_or_default()
    }

    /// Ids of the notifications currently shown.
    pub async fn get_all(browser: &Browser) -> Result<Vec<String>> {
        let shown = base::invoke::<Self>(browser, "getAll", vec![]).await?;
        Ok(shown
            .as_object()
            .map(|ids| ids.keys().cloned().collect())
            .unwrap_or_default())
    }

    pub async fn get_permission_level(browser: &Browser) -> Result<String> {
        let level = base::invoke::<Self>(browser, "getPermissionLevel", vec![]).await?;
        Ok(serde_json::from_value(level)?)
    }

    pub async fn clear_by_id(browser: &Browser, id: &str) -> Result<bool> {
        let cleared = base::invoke::<Self>(browser, "clear", vec![json!(id)]).await?;
        Ok(cleared.as_bool().unwrap_or(false))
    }

    /// Clear every shown notification; returns the ids that were cleared.
    pub async fn clear_all(browser: &Browser) -> Result<Vec<String>> {
        let ids = Self::get_all(browser).await?;
        try_join_all(ids.iter().map(|id| Self::clear_by_id(browser, id))).await?;
        Ok(ids)
    }

    /// Show (or refresh) this notification.
    ///
    /// Keys of `options` the template accepts update the instance first. Only the options
    /// of the current template are sent. Resolves with the host's answer: the id for
    /// [`DisplayAction::Create`], whether anything changed for [`DisplayAction::Update`].
    pub async fn display(&mut self, options: Option<&Value>, action: DisplayAction) -> Result<Value> {
        let template = self.template_type();
        let allowed = fields_for_type(template);

        if let Some(options) = options.and_then(Value::as_object) {
            let updates: Map<String, Value> = options
                .iter()
                .filter(|(key, value)| allowed.contains(&key.as_str()) && !value.is_null())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            base::project_fields(&mut self.info, &allowed, &Value::Object(updates))?;
        }

        let current = serde_json::to_value(&self.info)?;
        let mut payload = Map::new();
        payload.insert("type".to_string(), json!(template.as_str()));
        for key in &allowed {
            if let Some(value) = current.get(*key).filter(|value| !value.is_null()) {
                payload.insert((*key).to_string(), value.clone());
            }
        }

        base::invoke::<Self>(
            &self.browser,
            action.method_name(),
            vec![json!(self.id), Value::Object(payload)],
        )
        .await
    }

    pub async fn clear(&self) -> Result<bool> {
        Self::clear_by_id(&self.browser, &self.id).await
    }

    pub fn subscribe<F>(browser: &Browser, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        base::subscribe_event::<Self>(browser, event_type, Arc::new(listener))
    }

    /// Listen to events about this notification only (the first event argument is its id).
    pub fn add_event_listener<F>(&self, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        let id = self.id.clone();
        Self::subscribe(&self.browser, event_type, move |args| {
            if args.first().and_then(Value::as_str) == Some(id.as_str()) {
                listener(args);
            }
        })
    }

    /// A constant of the host namespace (`TemplateType`, `PermissionLevel`).
    pub fn constant(browser: &Browser, name: &str) -> Result<Value> {
        base::read_constant::<Self>(browser, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use webext_host_api::test::MockHost;

    fn browser(host: &MockHost) -> Browser {
        host.namespace("notifications")
            .method("create", |args| Ok(vec![args[0].clone()]))
            .method("update", |_| Ok(vec![json!(true)]))
            .method("clear", |_| Ok(vec![json!(true)]))
            .method("getAll", |_| Ok(vec![json!({"a": true, "b": true})]))
            .method("getPermissionLevel", |_| Ok(vec![json!("granted")]));
        Browser::new(Arc::new(host.clone()))
    }

    #[test]
    fn test_fields_for_type() {
        assert_eq!(fields_for_type(TemplateType::Basic), BASE_OPTIONS.to_vec());
        assert_eq!(fields_for_type(TemplateType::Image).last(), Some(&"imageUrl"));
        assert_eq!(fields_for_type(TemplateType::List).last(), Some(&"items"));
        assert_eq!(fields_for_type(TemplateType::Progress).last(), Some(&"progress"));
    }

    #[test]
    fn test_invalid_type_is_rejected() {
        let host = MockHost::new();
        let browser = browser(&host);

        let err = Notification::new(&browser, Some("n"), &json!({"type": "banner"}))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Invalid notification type: banner");
        assert!(matches!(err, ExtensionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_display_sends_only_template_options() {
        let host = MockHost::new();
        let browser = browser(&host);

        let mut n = Notification::new(
            &browser,
            Some("n1"),
            &json!({"title": "T", "message": "M", "progress": 40, "priority": 2}),
        )
        .unwrap();

        let id = n.display(None, DisplayAction::Create).await.unwrap();
        assert_eq!(id, json!("n1"));

        let sent = &host.namespace("notifications").calls("create")[0].args;
        assert_eq!(sent[1], json!({"type": "basic", "title": "T", "message": "M"}));

        let updated = n
            .display(Some(&json!({"message": "M2", "priority": 0})), DisplayAction::Update)
            .await
            .unwrap();
        assert_eq!(updated, json!(true));
        assert_eq!(n.info().message.as_deref(), Some("M2"));
        assert_eq!(n.info().priority, Some(2));
    }

    #[tokio::test]
    async fn test_progress_template_includes_progress() {
        let host = MockHost::new();
        let browser = browser(&host);

        Notification::create(
            &browser,
            None,
            &json!({"title": "Upload", "type": "progress", "progress": 10}),
        )
        .await
        .unwrap();

        let sent = &host.namespace("notifications").calls("create")[0].args;
        assert_eq!(sent[0], json!("Upload"));
        assert_eq!(sent[1]["progress"], json!(10));
        assert_eq!(sent[1]["type"], json!("progress"));
    }

    #[tokio::test]
    async fn test_clear_all_clears_every_shown_id() {
        let host = MockHost::new();
        let browser = browser(&host);

        let mut cleared = Notification::clear_all(&browser).await.unwrap();
        cleared.sort();
        assert_eq!(cleared, vec!["a".to_string(), "b".to_string()]);

        let calls = host.namespace("notifications").calls("clear");
        assert_eq!(calls.len(), 2);
        assert_eq!(
            Notification::get_permission_level(&browser).await.unwrap(),
            "granted"
        );
    }
}
