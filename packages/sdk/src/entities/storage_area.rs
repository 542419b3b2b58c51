use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use webext_host_api::{get_api_event, ApiMetadata, ApiMethod, ApiValue, HostApi, HostApiError, MethodMetadata};

use super::base::{self, ExtensionClass};
use crate::browser::Browser;
use crate::error::{ExtensionError, Result};

// Every area (`local`, `sync`, `managed`) shares the same method table.
static METADATA: Lazy<ApiMetadata> = Lazy::new(|| {
    let area = ApiMetadata::builder()
        .method("get", MethodMetadata::new(0, 1))
        .method("getBytesInUse", MethodMetadata::new(0, 1))
        .method("set", MethodMetadata::new(1, 1))
        .method("remove", MethodMetadata::new(1, 1))
        .method("clear", MethodMetadata::new(0, 0))
        .build();
    ApiMetadata::builder().wildcard(area).build()
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageAreaType {
    #[default]
    Local,
    Sync,
    Managed,
}

impl StorageAreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageAreaType::Local => "local",
            StorageAreaType::Sync => "sync",
            StorageAreaType::Managed => "managed",
        }
    }
}

impl fmt::Display for StorageAreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageAreaType {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(StorageAreaType::Local),
            "sync" => Ok(StorageAreaType::Sync),
            "managed" => Ok(StorageAreaType::Managed),
            other => Err(ExtensionError::validation(format!(
                "Storage area '{other}' is invalid."
            ))),
        }
    }
}

/// One storage area of the host.
///
/// Instances are only handed out by [`StorageArea::get_storage`], one per area and
/// [`Browser`].
pub struct StorageArea {
    area: StorageAreaType,
    storage: Arc<dyn HostApi>,
    api: Arc<dyn HostApi>,
}

impl ExtensionClass for StorageArea {
    const CLASS_NAME: &'static str = "StorageArea";
    const API_NAME: &'static str = "storage";
    const FIELDS: &'static [&'static str] = &[];

    fn metadata() -> &'static ApiMetadata {
        &METADATA
    }
}

impl StorageArea {
    fn new(browser: &Browser, area: StorageAreaType) -> Result<Self> {
        let storage = base::resolve_namespace::<Self>(browser)?;

        let api = match storage.get_property(area.as_str()) {
            Some(ApiValue::Namespace(api)) => api,
            _ => {
                return Err(HostApiError::not_supported(format!("'{area}' storage area")).into())
            }
        };

        Ok(Self { area, storage, api })
    }

    /// The storage area called `area_name`.
    pub fn get_storage(browser: &Browser, area_name: &str) -> Result<Arc<StorageArea>> {
        let area: StorageAreaType = area_name.parse()?;
        browser.storage_area(area, || Self::new(browser, area))
    }

    pub fn default_storage(browser: &Browser) -> Result<Arc<StorageArea>> {
        let area = StorageAreaType::default();
        browser.storage_area(area, || Self::new(browser, area))
    }

    pub fn area(&self) -> StorageAreaType {
        self.area
    }

    fn method(&self, name: &str) -> Result<ApiMethod> {
        let qualified = format!("{}.{}.{}", Self::CLASS_NAME, self.area, name);
        base::method_of(self.api.as_ref(), &qualified, name)
    }

    async fn call(&self, name: &str, keys: Option<Value>) -> Result<Value> {
        let args = keys.into_iter().collect();
        Ok(self.method(name)?.call(args).await?)
    }

    /// Items for `keys` (a key, a list of keys, or an object of defaults); everything when `None`.
    pub async fn get(&self, keys: Option<Value>) -> Result<Map<String, Value>> {
        let items = self.call("get", keys).await?;
        Ok(serde_json::from_value(items)?)
    }

    pub async fn get_bytes_in_use(&self, keys: Option<Value>) -> Result<u64> {
        let bytes = self.call("getBytesInUse", keys).await?;
        Ok(serde_json::from_value(bytes)?)
    }

    pub async fn set(&self, items: Value) -> Result<()> {
        self.call("set", Some(items)).await?;
        Ok(())
    }

    pub async fn remove(&self, keys: Value) -> Result<()> {
        self.call("remove", Some(keys)).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.call("clear", None).await?;
        Ok(())
    }

    /// Listen to storage events concerning this area only. The listener receives the changes.
    pub fn add_event_listener<F>(&self, event_type: &str, listener: F) -> Result<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let area = self.area;
        get_api_event(self.storage.as_ref(), event_type)?.add_listener(Arc::new(
            move |args: Vec<Value>| {
                if args.get(1).and_then(Value::as_str) != Some(area.as_str()) {
                    return;
                }
                listener(args.into_iter().next().unwrap_or(Value::Null));
            },
        ));
        Ok(())
    }
}

impl fmt::Debug for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageArea").field("area", &self.area).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use webext_host_api::test::MockHost;

    fn browser(host: &MockHost) -> Browser {
        let storage = host.namespace("storage").event("onChanged");
        let items = Arc::new(Mutex::new(Map::new()));
        let reader = Arc::clone(&items);
        let writer = Arc::clone(&items);

        storage
            .namespace("local")
            .method("get", move |_| Ok(vec![Value::Object(reader.lock().unwrap().clone())]))
            .method("set", move |args| {
                if let Some(new) = args[0].as_object() {
                    writer.lock().unwrap().extend(new.clone());
                }
                Ok(vec![])
            })
            .method("getBytesInUse", |_| Ok(vec![json!(42)]))
            .method("clear", |_| Ok(vec![]));
        Browser::new(Arc::new(host.clone()))
    }

    #[test]
    fn test_area_names() {
        assert_eq!("sync".parse::<StorageAreaType>().unwrap(), StorageAreaType::Sync);
        let err = "bogus".parse::<StorageAreaType>().unwrap_err();
        assert_eq!(err.to_string(), "Storage area 'bogus' is invalid.");
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let host = MockHost::new();
        let browser = browser(&host);
        let local = StorageArea::default_storage(&browser).unwrap();

        local.set(json!({"theme": "dark"})).await.unwrap();
        let items = local.get(None).await.unwrap();

        assert_eq!(items.get("theme"), Some(&json!("dark")));
        assert_eq!(local.get_bytes_in_use(None).await.unwrap(), 42);
        assert!(host.namespace("storage").namespace("local").calls("get")[0].args.is_empty());
    }

    #[test]
    fn test_missing_area_is_not_supported() {
        let host = MockHost::new();
        let browser = browser(&host);

        let err = StorageArea::get_storage(&browser, "managed").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Your browser does not support 'managed' storage area."
        );
    }

    #[tokio::test]
    async fn test_missing_method_names_the_area() {
        let host = MockHost::new();
        let browser = browser(&host);
        let local = StorageArea::get_storage(&browser, "local").unwrap();

        let err = local.remove(json!("theme")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Your browser does not support 'StorageArea.local.remove()'."
        );
    }

    #[test]
    fn test_listener_filters_by_area() {
        let host = MockHost::new();
        let browser = browser(&host);
        let local = StorageArea::get_storage(&browser, "local").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        local
            .add_event_listener("changed", move |changes| sink.lock().unwrap().push(changes))
            .unwrap();

        let storage = host.namespace("storage");
        storage.emit("onChanged", vec![json!({"a": {"newValue": 1}}), json!("sync")]);
        storage.emit("onChanged", vec![json!({"b": {"newValue": 2}}), json!("local")]);

        assert_eq!(*seen.lock().unwrap(), vec![json!({"b": {"newValue": 2}})]);
    }
}
