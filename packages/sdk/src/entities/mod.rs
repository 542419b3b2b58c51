pub mod alarm;
pub mod base;
pub mod browser_window;
pub mod command;
pub mod notification;
pub mod storage_area;
pub mod tab;

pub use alarm::{Alarm, AlarmInfo};
pub use base::ExtensionClass;
pub use browser_window::{BrowserWindow, WindowInfo};
pub use command::{Command, CommandInfo};
pub use notification::{
    fields_for_type, DisplayAction, Notification, NotificationButton, NotificationInfo,
    NotificationItem, TemplateType,
};
pub use storage_area::{StorageArea, StorageAreaType};
pub use tab::{MutedInfo, Tab, TabInfo};
