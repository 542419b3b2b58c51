use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use webext_host_api::{ApiMetadata, MethodMetadata};

use super::base::{self, ExtensionClass};
use super::tab::{Tab, TabInfo};
use crate::browser::Browser;
use crate::error::{ExtensionError, Result};

static METADATA: Lazy<ApiMetadata> = Lazy::new(|| {
    ApiMetadata::builder()
        .method("create", MethodMetadata::new(0, 1))
        .method("getAll", MethodMetadata::new(0, 1))
        .method("get", MethodMetadata::new(1, 2))
        .method("getCurrent", MethodMetadata::new(0, 1))
        .method("getLastFocused", MethodMetadata::new(0, 1))
        .method("update", MethodMetadata::new(2, 2))
        .method("remove", MethodMetadata::new(1, 1))
        .build()
});

/// Update directives that only affect how the host presents the window.
const TRANSIENT_UPDATE_KEYS: [&str; 2] = ["drawAttention", "titlePreface"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_on_top: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incognito: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Only populated when the window was fetched with `populate: true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<TabInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub window_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
}

/// A browser window.
#[derive(Clone)]
pub struct BrowserWindow {
    browser: Browser,
    info: WindowInfo,
}

impl ExtensionClass for BrowserWindow {
    const CLASS_NAME: &'static str = "BrowserWindow";
    const API_NAME: &'static str = "windows";
    const FIELDS: &'static [&'static str] = &[
        "alwaysOnTop",
        "focused",
        "height",
        "id",
        "incognito",
        "left",
        "sessionId",
        "state",
        "tabs",
        "top",
        "type",
        "width",
    ];

    fn metadata() -> &'static ApiMetadata {
        &METADATA
    }
}

impl BrowserWindow {
    pub fn from_record(browser: &Browser, record: &Value) -> Result<Self> {
        Ok(Self {
            browser: browser.clone(),
            info: base::from_record(Self::FIELDS, record)?,
        })
    }

    pub fn info(&self) -> &WindowInfo {
        &self.info
    }

    pub fn id(&self) -> Option<i64> {
        self.info.id
    }

    fn require_id(&self) -> Result<i64> {
        self.info
            .id
            .ok_or_else(|| ExtensionError::validation("This window has no id"))
    }

    async fn fetch(browser: &Browser, name: &str, args: Vec<Value>) -> Result<BrowserWindow> {
        let record = base::invoke::<Self>(browser, name, args).await?;
        Self::from_record(browser, &record)
    }

    pub async fn open(browser: &Browser, create_data: Option<Value>) -> Result<BrowserWindow> {
        Self::fetch(browser, "create", create_data.into_iter().collect()).await
    }

    pub async fn get_all(browser: &Browser, get_info: Option<Value>) -> Result<Vec<BrowserWindow>> {
        let records = base::invoke::<Self>(browser, "getAll", get_info.into_iter().collect()).await?;
        let infos: Vec<WindowInfo> = base::from_records(Self::FIELDS, records)?;

        Ok(infos
            .into_iter()
            .map(|info| BrowserWindow {
                browser: browser.clone(),
                info,
            })
            .collect())
    }

    pub async fn get(browser: &Browser, window_id: i64, get_info: Option<Value>) -> Result<BrowserWindow> {
        let mut args = vec![json!(window_id)];
        args.extend(get_info);
        Self::fetch(browser, "get", args).await
    }

    pub async fn get_current(browser: &Browser, get_info: Option<Value>) -> Result<BrowserWindow> {
        Self::fetch(browser, "getCurrent", get_info.into_iter().collect()).await
    }

    pub async fn get_last_focused(browser: &Browser, get_info: Option<Value>) -> Result<BrowserWindow> {
        Self::fetch(browser, "getLastFocused", get_info.into_iter().collect()).await
    }

    /// Apply `update_info`, then copy the requested values onto this window.
    ///
    /// `drawAttention` and `titlePreface` are sent to the host but never stored.
    pub async fn update(&mut self, update_info: Value) -> Result<()> {
        let id = self.require_id()?;
        base::invoke::<Self>(&self.browser, "update", vec![json!(id), update_info.clone()]).await?;

        let Value::Object(requested) = update_info else {
            return Ok(());
        };
        let persisted: Map<String, Value> = requested
            .into_iter()
            .filter(|(key, _)| !TRANSIENT_UPDATE_KEYS.contains(&key.as_str()))
            .collect();

        base::project_fields(&mut self.info, Self::FIELDS, &Value::Object(persisted))
    }

    pub async fn close(&self) -> Result<()> {
        let id = self.require_id()?;
        base::invoke::<Self>(&self.browser, "remove", vec![json!(id)]).await?;
        Ok(())
    }

    /// Open a tab in this window.
    pub async fn open_tab(&self, create_properties: Option<Value>) -> Result<Tab> {
        let id = self.require_id()?;

        let mut properties = match create_properties {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                return Err(ExtensionError::validation(format!(
                    "Tab create properties must be an object, got {other}"
                )))
            }
        };
        properties.insert("windowId".to_string(), json!(id));

        Tab::open(&self.browser, Value::Object(properties)).await
    }

    /// The tabs embedded in this window's record.
    pub fn tabs(&self) -> Vec<Tab> {
        self.info
            .tabs
            .iter()
            .flatten()
            .cloned()
            .map(|info| Tab::from_info(&self.browser, info))
            .collect()
    }

    pub fn subscribe<F>(browser: &Browser, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        base::subscribe_event::<Self>(browser, event_type, Arc::new(listener))
    }

    /// A constant of the host namespace (`WINDOW_ID_NONE`, `WindowState`, ...).
    pub fn constant(browser: &Browser, name: &str) -> Result<Value> {
        base::read_constant::<Self>(browser, name)
    }
}
