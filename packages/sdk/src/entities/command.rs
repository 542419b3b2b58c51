use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use webext_host_api::{ApiMetadata, MethodMetadata};

use super::base::{self, ExtensionClass};
use crate::browser::Browser;
use crate::error::{ExtensionError, Result};

static METADATA: Lazy<ApiMetadata> = Lazy::new(|| {
    ApiMetadata::builder()
        .method("getAll", MethodMetadata::new(0, 0))
        .method("reset", MethodMetadata::new(0, 1))
        .method("update", MethodMetadata::new(1, 1))
        .build()
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Empty when the command has no active shortcut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

/// A keyboard command declared in the manifest.
#[derive(Clone)]
pub struct Command {
    browser: Browser,
    info: CommandInfo,
}

impl ExtensionClass for Command {
    const CLASS_NAME: &'static str = "Command";
    const API_NAME: &'static str = "commands";
    const FIELDS: &'static [&'static str] = &["description", "name", "shortcut"];

    fn metadata() -> &'static ApiMetadata {
        &METADATA
    }
}

impl Command {
    pub fn new(browser: &Browser, info: &Value) -> Result<Self> {
        Ok(Self {
            browser: browser.clone(),
            info: base::from_record(Self::FIELDS, info)?,
        })
    }

    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    pub fn name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    fn require_name(&self) -> Result<&str> {
        self.name()
            .ok_or_else(|| ExtensionError::validation("Command has no name"))
    }

    pub async fn get_all(browser: &Browser) -> Result<Vec<Command>> {
        let commands = base::invoke::<Self>(browser, "getAll", vec![]).await?;
        let infos: Vec<CommandInfo> = base::from_records(Self::FIELDS, commands)?;

        Ok(infos
            .into_iter()
            .map(|info| Command {
                browser: browser.clone(),
                info,
            })
            .collect())
    }

    pub async fn get(browser: &Browser, name: &str) -> Result<Option<Command>> {
        let commands = Self::get_all(browser).await?;
        Ok(commands.into_iter().find(|command| command.name() == Some(name)))
    }

    /// Refresh this command from the host's current list.
    pub async fn reload(&mut self) -> Result<()> {
        let name = self.require_name()?.to_string();
        let commands = base::invoke::<Self>(&self.browser, "getAll", vec![]).await?;

        let record = commands
            .as_array()
            .and_then(|all| all.iter().find(|c| c.get("name").and_then(Value::as_str) == Some(name.as_str())))
            .ok_or_else(|| ExtensionError::NotFound(format!("Command '{name}' was not found.")))?;

        base::project_fields(&mut self.info, Self::FIELDS, record)
    }

    /// Restore the manifest shortcut.
    pub async fn reset(&mut self) -> Result<()> {
        let name = self.require_name()?.to_string();
        base::invoke::<Self>(&self.browser, "reset", vec![json!(name)]).await?;
        self.reload().await
    }

    /// Change the description or shortcut. The command name in `details` is always this one.
    pub async fn update(&mut self, details: Value) -> Result<()> {
        let name = self.require_name()?.to_string();

        let mut details = match details {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(ExtensionError::validation(format!(
                    "Command update details must be an object, got {other}"
                )))
            }
        };
        details.insert("name".to_string(), json!(name));

        base::invoke::<Self>(&self.browser, "update", vec![Value::Object(details)]).await?;
        self.reload().await
    }

    pub fn subscribe<F>(browser: &Browser, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        base::subscribe_event::<Self>(browser, event_type, Arc::new(listener))
    }
}
