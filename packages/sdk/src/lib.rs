//! # WebExtension SDK
//!
//! Typed entities over the host namespaces of a WebExtension: alarms, commands,
//! notifications, storage areas, tabs and windows.
//!
//! Every entity goes through a [`Browser`] handle, which owns the host adapter (see
//! `webext-host-api`) and therefore works the same on callback-last and promise-native
//! hosts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use webext_sdk::prelude::*;
//!
//! let browser = Browser::new(runtime);
//! let tabs = Tab::query(&browser, json!({"active": true})).await?;
//! ```

pub mod browser;
pub mod config;
pub mod entities;
pub mod error;
pub mod prelude;

pub use browser::Browser;
pub use config::{ConfigFormat, NotificationDefaults, SdkConfig};
pub use entities::*;
pub use error::{ExtensionError, Result};
pub use webext_host_api as host_api;
