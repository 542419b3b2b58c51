use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use webext_host_api::{ApiMetadata, MethodMetadata};

use super::base::{self, ExtensionClass};
use crate::browser::Browser;
use crate::error::Result;

static METADATA: Lazy<ApiMetadata> = Lazy::new(|| {
    ApiMetadata::builder()
        // Older hosts reject the trailing callback of alarms.create.
        .method("create", MethodMetadata::new(1, 2).fallback_to_no_callback())
        .method("clear", MethodMetadata::new(0, 1))
        .method("clearAll", MethodMetadata::new(0, 0))
        .method("get", MethodMetadata::new(0, 1))
        .method("getAll", MethodMetadata::new(0, 0))
        .build()
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_in_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_in_minutes: Option<f64>,
    /// Epoch milliseconds of the next firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<f64>,
}

/// A scheduled alarm.
#[derive(Clone)]
pub struct Alarm {
    browser: Browser,
    info: AlarmInfo,
}

impl ExtensionClass for Alarm {
    const CLASS_NAME: &'static str = "Alarm";
    const API_NAME: &'static str = "alarms";
    const FIELDS: &'static [&'static str] = &["name", "delayInMinutes", "periodInMinutes", "when"];

    fn metadata() -> &'static ApiMetadata {
        &METADATA
    }
}

impl Alarm {
    pub fn from_record(browser: &Browser, record: &Value) -> Result<Self> {
        Ok(Self {
            browser: browser.clone(),
            info: base::from_record(Self::FIELDS, record)?,
        })
    }

    pub fn info(&self) -> &AlarmInfo {
        &self.info
    }

    pub fn name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    /// Schedule an alarm. `alarm_info` carries `when`, `delayInMinutes` and `periodInMinutes`.
    pub async fn create(browser: &Browser, name: &str, alarm_info: Value) -> Result<()> {
        base::invoke::<Self>(browser, "create", vec![json!(name), alarm_info]).await?;
        Ok(())
    }

    pub async fn get_all(browser: &Browser) -> Result<Vec<Alarm>> {
        let alarms = base::invoke::<Self>(browser, "getAll", vec![]).await?;
        let infos: Vec<AlarmInfo> = base::from_records(Self::FIELDS, alarms)?;

        Ok(infos
            .into_iter()
            .map(|info| Alarm {
                browser: browser.clone(),
                info,
            })
            .collect())
    }

    /// The alarm called `name` (the unnamed alarm when `None`), if it is scheduled.
    pub async fn get(browser: &Browser, name: Option<&str>) -> Result<Option<Alarm>> {
        let args = name.map(|name| vec![json!(name)]).unwrap_or_default();
        let record = base::invoke::<Self>(browser, "get", args).await?;

        if !record.is_object() {
            return Ok(None);
        }
        Self::from_record(browser, &record).map(Some)
    }

    pub async fn clear_all(browser: &Browser) -> Result<bool> {
        let cleared = base::invoke::<Self>(browser, "clearAll", vec![]).await?;
        Ok(cleared.as_bool().unwrap_or(false))
    }

    /// Cancel this alarm. Resolves to whether the host found one to clear.
    pub async fn clear(&self) -> Result<bool> {
        let args = self.name().map(|name| vec![json!(name)]).unwrap_or_default();
        let cleared = base::invoke::<Self>(&self.browser, "clear", args).await?;
        Ok(cleared.as_bool().unwrap_or(false))
    }

    /// Listen to every alarm of the extension.
    pub fn subscribe<F>(browser: &Browser, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Alarm) + Send + Sync + 'static,
    {
        let owner = browser.clone();
        base::subscribe_event::<Self>(
            browser,
            event_type,
            Arc::new(move |args: Vec<Value>| {
                let record = args.into_iter().next().unwrap_or(Value::Null);
                match Alarm::from_record(&owner, &record) {
                    Ok(alarm) => listener(alarm),
                    Err(error) => tracing::warn!(%error, "ignoring malformed alarm event"),
                }
            }),
        )
    }

    /// Listen to the firings of this alarm only.
    pub fn add_event_listener<F>(&self, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Alarm) + Send + Sync + 'static,
    {
        let this = self.clone();
        Self::subscribe(&self.browser, event_type, move |alarm| {
            if alarm.name() == this.name() {
                listener(this.clone());
            }
        })
    }
}
