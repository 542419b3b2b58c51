pub use crate::browser::Browser;
pub use crate::config::SdkConfig;
pub use crate::entities::{
    Alarm, BrowserWindow, Command, DisplayAction, Notification, StorageArea, StorageAreaType,
    Tab, TemplateType,
};
pub use crate::error::{ExtensionError, Result};
pub use serde_json::json;
