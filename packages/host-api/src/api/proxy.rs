//! Lazy, memoizing adapters over host namespaces.
//!
//! [`ProxyNamespace`] decides per property, on first access, whether it is an adapted
//! method, a nested namespace or a passthrough, and caches that decision.
//! [`NativeNamespace`] is the untouched view handed out on promise-native hosts.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::host::{HostEvent, HostObject, HostValue, LastError};
use super::lock;
use super::metadata::{ApiMetadata, MetadataEntry};
use super::wrapper::{bind_function, wrap_async_function, ApiMethod};
use crate::error::HostApiError;

/// A namespace property as seen by callers of the adapted API.
#[derive(Clone)]
pub enum ApiValue {
    Method(ApiMethod),
    Namespace(Arc<dyn HostApi>),
    Event(Arc<dyn HostEvent>),
    Data(Value),
}

impl ApiValue {
    pub fn as_method(&self) -> Option<&ApiMethod> {
        match self {
            ApiValue::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Arc<dyn HostApi>> {
        match self {
            ApiValue::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            ApiValue::Data(v) => Some(v),
            _ => None,
        }
    }

    /// Convert a raw host value without adapting anything.
    fn passthrough(name: &str, value: HostValue) -> Self {
        match value {
            HostValue::Data(v) => ApiValue::Data(v),
            HostValue::Function(f) => ApiValue::Method(bind_function(name, f)),
            HostValue::Object(o) => ApiValue::Namespace(Arc::new(NativeNamespace::new(o))),
            HostValue::Event(e) => ApiValue::Event(e),
        }
    }
}

impl fmt::Debug for ApiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiValue::Method(m) => f.debug_tuple("Method").field(m).finish(),
            ApiValue::Namespace(_) => f.write_str("Namespace(..)"),
            ApiValue::Event(_) => f.write_str("Event(..)"),
            ApiValue::Data(v) => f.debug_tuple("Data").field(v).finish(),
        }
    }
}

/// The uniform, promise-based view of a host namespace.
#[async_trait]
pub trait HostApi: Send + Sync {
    fn get_property(&self, name: &str) -> Option<ApiValue>;

    fn set_property(&self, name: &str, value: Value);

    fn has_property(&self, name: &str) -> bool;

    fn define_property(&self, name: &str, value: ApiValue) -> bool;

    fn delete_property(&self, name: &str) -> bool;

    fn keys(&self) -> Vec<String>;

    /// Resolve `name` as a method and call it.
    async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, HostApiError> {
        match self.get_property(name) {
            Some(ApiValue::Method(method)) => method.call(args).await,
            Some(_) => Err(HostApiError::NotAFunction(name.to_string())),
            None => Err(HostApiError::not_supported(format!("'{name}()'"))),
        }
    }
}

enum CacheSlot {
    Resolved(ApiValue),
    /// Live accessor: reads and writes go straight to the target.
    Forward,
}

/// Caching decorator that adapts a callback-last namespace.
pub struct ProxyNamespace {
    target: Arc<dyn HostObject>,
    metadata: ApiMetadata,
    last_error: LastError,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

/// Wrap `target` so that every method listed in `metadata` returns a future.
pub fn wrap_api(
    target: Arc<dyn HostObject>,
    metadata: ApiMetadata,
    last_error: LastError,
) -> Arc<dyn HostApi> {
    Arc::new(ProxyNamespace::new(target, metadata, last_error))
}

impl ProxyNamespace {
    pub fn new(target: Arc<dyn HostObject>, metadata: ApiMetadata, last_error: LastError) -> Self {
        Self {
            target,
            metadata,
            last_error,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Decide how an uncached property is exposed.
    fn resolve(&self, name: &str, value: HostValue) -> (ApiValue, CacheSlot) {
        let resolved = match value {
            HostValue::Function(function) => match self.metadata.get(name) {
                Some(MetadataEntry::Method(metadata)) => ApiValue::Method(wrap_async_function(
                    Arc::clone(&self.target),
                    name,
                    metadata.clone(),
                    self.last_error.clone(),
                )),
                _ => ApiValue::Method(bind_function(name, function)),
            },
            HostValue::Object(object) => {
                // The wildcard only covers names with no entry of their own.
                let nested = match self.metadata.get(name) {
                    Some(MetadataEntry::Namespace(metadata)) => Some(metadata),
                    Some(MetadataEntry::Method(_)) => None,
                    None => self.metadata.wildcard(),
                };

                match nested {
                    Some(metadata) => ApiValue::Namespace(wrap_api(
                        object,
                        metadata.clone(),
                        self.last_error.clone(),
                    )),
                    None => {
                        let value = ApiValue::passthrough(name, HostValue::Object(object));
                        return (value, CacheSlot::Forward);
                    }
                }
            }
            other => return (ApiValue::passthrough(name, other), CacheSlot::Forward),
        };

        (resolved.clone(), CacheSlot::Resolved(resolved))
    }
}

#[async_trait]
impl HostApi for ProxyNamespace {
    fn get_property(&self, name: &str) -> Option<ApiValue> {
        match lock(&self.cache).get(name) {
            Some(CacheSlot::Resolved(value)) => return Some(value.clone()),
            Some(CacheSlot::Forward) => {
                return self
                    .target
                    .get(name)
                    .map(|value| ApiValue::passthrough(name, value));
            }
            None => {}
        }

        let raw = self.target.get(name)?;
        let (value, slot) = self.resolve(name, raw);

        let mut cache = lock(&self.cache);
        match cache.get(name) {
            // Another caller filled the slot meanwhile; keep theirs so identity stays stable.
            Some(CacheSlot::Resolved(existing)) => Some(existing.clone()),
            _ => {
                tracing::trace!(property = name, "caching namespace property");
                cache.insert(name.to_string(), slot);
                Some(value)
            }
        }
    }

    fn set_property(&self, name: &str, value: Value) {
        let mut cache = lock(&self.cache);
        if let Some(CacheSlot::Resolved(slot)) = cache.get_mut(name) {
            *slot = ApiValue::Data(value);
            return;
        }
        drop(cache);

        self.target.set(name, HostValue::Data(value));
    }

    fn has_property(&self, name: &str) -> bool {
        self.target.contains(name) || lock(&self.cache).contains_key(name)
    }

    fn define_property(&self, name: &str, value: ApiValue) -> bool {
        lock(&self.cache).insert(name.to_string(), CacheSlot::Resolved(value));
        true
    }

    fn delete_property(&self, name: &str) -> bool {
        lock(&self.cache).remove(name).is_some()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = self.target.keys();
        for name in lock(&self.cache).keys() {
            if !keys.contains(name) {
                keys.push(name.clone());
            }
        }
        keys
    }
}

/// The raw namespace of a promise-native host, exposed through [`HostApi`].
pub struct NativeNamespace {
    target: Arc<dyn HostObject>,
}

impl NativeNamespace {
    pub fn new(target: Arc<dyn HostObject>) -> Self {
        Self { target }
    }
}

#[async_trait]
impl HostApi for NativeNamespace {
    fn get_property(&self, name: &str) -> Option<ApiValue> {
        self.target
            .get(name)
            .map(|value| ApiValue::passthrough(name, value))
    }

    fn set_property(&self, name: &str, value: Value) {
        self.target.set(name, HostValue::Data(value));
    }

    fn has_property(&self, name: &str) -> bool {
        self.target.contains(name)
    }

    fn define_property(&self, name: &str, value: ApiValue) -> bool {
        match value {
            ApiValue::Data(v) => {
                self.target.set(name, HostValue::Data(v));
                true
            }
            ApiValue::Event(e) => {
                self.target.set(name, HostValue::Event(e));
                true
            }
            ApiValue::Method(_) | ApiValue::Namespace(_) => false,
        }
    }

    fn delete_property(&self, name: &str) -> bool {
        self.target.delete(name)
    }

    fn keys(&self) -> Vec<String> {
        self.target.keys()
    }
}

/// Name of the host event object for `event_type`: `"closed"` becomes `"onClosed"`.
pub fn event_name(event_type: &str) -> Option<String> {
    let mut chars = event_type.chars();
    let first = chars.next()?;
    Some(format!("on{}{}", first.to_uppercase(), chars.as_str()))
}

/// Look up the `onX` event object of `api` for `event_type`.
pub fn get_api_event(api: &dyn HostApi, event_type: &str) -> Result<Arc<dyn HostEvent>, HostApiError> {
    let unsupported = || HostApiError::not_supported(format!("'{event_type}' events"));

    let name = event_name(event_type).ok_or_else(unsupported)?;
    match api.get_property(&name) {
        Some(ApiValue::Event(event)) => Ok(event),
        _ => Err(unsupported()),
    }
}
