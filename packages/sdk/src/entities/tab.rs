use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;
use webext_host_api::{ApiMetadata, MethodMetadata};

use super::base::{self, ExtensionClass};
use super::browser_window::BrowserWindow;
use crate::browser::Browser;
use crate::error::{ExtensionError, Result};

static METADATA: Lazy<ApiMetadata> = Lazy::new(|| {
    ApiMetadata::builder()
        .method("captureVisibleTab", MethodMetadata::new(0, 2))
        .method("create", MethodMetadata::new(1, 1))
        .method("detectLanguage", MethodMetadata::new(0, 1))
        .method("discard", MethodMetadata::new(0, 1))
        .method("duplicate", MethodMetadata::new(1, 1))
        .method("executeScript", MethodMetadata::new(1, 2))
        .method("get", MethodMetadata::new(1, 1))
        .method("getCurrent", MethodMetadata::new(0, 0))
        .method("getZoom", MethodMetadata::new(0, 1))
        .method("getZoomSettings", MethodMetadata::new(0, 1))
        .method("goBack", MethodMetadata::new(0, 1))
        .method("goForward", MethodMetadata::new(0, 1))
        .method("highlight", MethodMetadata::new(1, 1))
        .method("insertCSS", MethodMetadata::new(1, 2))
        .method("move", MethodMetadata::new(2, 2))
        .method("query", MethodMetadata::new(1, 1))
        .method("reload", MethodMetadata::new(0, 2))
        .method("remove", MethodMetadata::new(1, 1))
        .method("removeCSS", MethodMetadata::new(1, 2))
        .method("sendMessage", MethodMetadata::new(2, 3))
        .method("setZoom", MethodMetadata::new(1, 2))
        .method("setZoomSettings", MethodMetadata::new(1, 2))
        .method("update", MethodMetadata::new(1, 2))
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutedInfo {
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_discardable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discarded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incognito: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted_info: Option<MutedInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Absent when the host reports no URL (missing `tabs` permission) or an empty one.
    #[serde(
        default,
        deserialize_with = "deserialize_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
}

fn deserialize_url<'de, D>(deserializer: D) -> std::result::Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => Url::parse(raw).map(Some).map_err(serde::de::Error::custom),
    }
}

/// A browser tab.
#[derive(Clone)]
pub struct Tab {
    browser: Browser,
    info: TabInfo,
}

impl ExtensionClass for Tab {
    const CLASS_NAME: &'static str = "Tab";
    const API_NAME: &'static str = "tabs";
    const FIELDS: &'static [&'static str] = &[
        "active",
        "audible",
        "autoDiscardable",
        "discarded",
        "favIconUrl",
        "frozen",
        "groupId",
        "height",
        "highlighted",
        "id",
        "incognito",
        "index",
        "lastAccessed",
        "mutedInfo",
        "openerTabId",
        "pendingUrl",
        "pinned",
        "sessionId",
        "status",
        "title",
        "url",
        "width",
        "windowId",
    ];

    fn metadata() -> &'static ApiMetadata {
        &METADATA
    }
}

impl Tab {
    pub fn from_record(browser: &Browser, record: &Value) -> Result<Self> {
        Ok(Self {
            browser: browser.clone(),
            info: base::from_record(Self::FIELDS, record)?,
        })
    }

    pub(crate) fn from_info(browser: &Browser, info: TabInfo) -> Self {
        Self {
            browser: browser.clone(),
            info,
        }
    }

    fn from_records(browser: &Browser, records: Value) -> Result<Vec<Tab>> {
        let infos: Vec<TabInfo> = base::from_records(Self::FIELDS, records)?;
        Ok(infos
            .into_iter()
            .map(|info| Self::from_info(browser, info))
            .collect())
    }

    fn from_optional_record(browser: &Browser, record: Value) -> Result<Option<Tab>> {
        if !record.is_object() {
            return Ok(None);
        }
        Self::from_record(browser, &record).map(Some)
    }

    pub fn info(&self) -> &TabInfo {
        &self.info
    }

    pub fn id(&self) -> Option<i64> {
        self.info.id
    }

    fn require_id(&self) -> Result<i64> {
        self.info
            .id
            .ok_or_else(|| ExtensionError::validation("This tab has no id"))
    }

    async fn call(&self, name: &str, mut args: Vec<Value>) -> Result<Value> {
        args.insert(0, json!(self.require_id()?));
        base::invoke::<Self>(&self.browser, name, args).await
    }

    pub async fn open(browser: &Browser, create_properties: Value) -> Result<Tab> {
        let record = base::invoke::<Self>(browser, "create", vec![create_properties]).await?;
        Self::from_record(browser, &record)
    }

    pub async fn get(browser: &Browser, tab_id: i64) -> Result<Tab> {
        let record = base::invoke::<Self>(browser, "get", vec![json!(tab_id)]).await?;
        Self::from_record(browser, &record)
    }

    /// The tab this code runs in; `None` outside of a tab (background pages, popups).
    pub async fn get_current(browser: &Browser) -> Result<Option<Tab>> {
        let record = base::invoke::<Self>(browser, "getCurrent", vec![]).await?;
        Self::from_optional_record(browser, record)
    }

    pub async fn query(browser: &Browser, query_info: Value) -> Result<Vec<Tab>> {
        let query_info = match query_info {
            Value::Null => json!({}),
            other => other,
        };
        let records = base::invoke::<Self>(browser, "query", vec![query_info]).await?;
        Self::from_records(browser, records)
    }

    pub async fn close_tabs(browser: &Browser, tab_ids: &[i64]) -> Result<()> {
        base::invoke::<Self>(browser, "remove", vec![json!(tab_ids)]).await?;
        Ok(())
    }

    pub async fn highlight(browser: &Browser, highlight_info: Value) -> Result<Value> {
        base::invoke::<Self>(browser, "highlight", vec![highlight_info]).await
    }

    pub async fn execute_script(&self, details: Value) -> Result<Value> {
        self.call("executeScript", vec![details]).await
    }

    pub async fn insert_css(&self, details: Value) -> Result<()> {
        self.call("insertCSS", vec![details]).await?;
        Ok(())
    }

    pub async fn remove_css(&self, details: Value) -> Result<()> {
        self.call("removeCSS", vec![details]).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        let id = self.require_id()?;
        Self::close_tabs(&self.browser, &[id]).await
    }

    /// Apply `update_properties` and merge the host's view of the tab back onto this one.
    pub async fn update(&mut self, update_properties: Value) -> Result<()> {
        let record = self.call("update", vec![update_properties]).await?;
        base::project_fields(&mut self.info, Self::FIELDS, &record)
    }

    pub async fn reload(&self, reload_properties: Option<Value>) -> Result<()> {
        self.call("reload", reload_properties.into_iter().collect())
            .await?;
        Ok(())
    }

    /// The duplicate, when the host reports it.
    pub async fn duplicate(&self) -> Result<Option<Tab>> {
        let record = self.call("duplicate", vec![]).await?;
        Self::from_optional_record(&self.browser, record)
    }

    /// Move this tab; the host answers with one tab or a list of them.
    pub async fn move_to(&self, move_properties: Value) -> Result<Vec<Tab>> {
        let moved = self.call("move", vec![move_properties]).await?;
        match moved {
            Value::Array(_) => Self::from_records(&self.browser, moved),
            Value::Object(_) => Ok(vec![Self::from_record(&self.browser, &moved)?]),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn send_message(&self, message: Value, options: Option<Value>) -> Result<Value> {
        let mut args = vec![message];
        args.extend(options);
        self.call("sendMessage", args).await
    }

    pub async fn get_zoom(&self) -> Result<f64> {
        let factor = self.call("getZoom", vec![]).await?;
        Ok(serde_json::from_value(factor)?)
    }

    pub async fn set_zoom(&self, zoom_factor: f64) -> Result<()> {
        self.call("setZoom", vec![json!(zoom_factor)]).await?;
        Ok(())
    }

    pub async fn detect_language(&self) -> Result<String> {
        let language = self.call("detectLanguage", vec![]).await?;
        Ok(serde_json::from_value(language)?)
    }

    pub async fn go_back(&self) -> Result<()> {
        self.call("goBack", vec![]).await?;
        Ok(())
    }

    pub async fn go_forward(&self) -> Result<()> {
        self.call("goForward", vec![]).await?;
        Ok(())
    }

    /// Unload this tab from memory. Returns the discarded tab when the host reports one.
    pub async fn discard(&self) -> Result<Option<Tab>> {
        let record = self.call("discard", vec![]).await?;
        Self::from_optional_record(&self.browser, record)
    }

    /// The window containing this tab.
    pub async fn get_window(&self, get_info: Option<Value>) -> Result<BrowserWindow> {
        let window_id = self
            .info
            .window_id
            .ok_or_else(|| ExtensionError::validation("This tab has no window id"))?;
        BrowserWindow::get(&self.browser, window_id, get_info).await
    }

    pub fn subscribe<F>(browser: &Browser, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        base::subscribe_event::<Self>(browser, event_type, Arc::new(listener))
    }

    /// A constant of the host namespace (`TAB_ID_NONE`, `TabStatus`, `ZoomSettingsMode`, ...).
    pub fn constant(browser: &Browser, name: &str) -> Result<Value> {
        base::read_constant::<Self>(browser, name)
    }
}
