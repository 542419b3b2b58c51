//! Host-side capability traits.
//!
//! These describe the foreign objects the adapter consumes: namespaces, their methods and
//! events, and the runtime that owns them. Concrete bindings (a WebExtension bridge, a
//! scripted test host, ...) implement them; nothing in this crate owns a host object.

use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::lock;

/// The trailing callback of the callback-last convention.
pub type HostCallback = Box<dyn FnOnce(Vec<Value>) + Send>;

/// A subscriber attached to a host event object.
pub type EventListener = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// An error thrown synchronously by the host while a method was being invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What a host method hands back synchronously.
pub enum HostReturn {
    /// A plain return value (`undefined` is `Value::Null`).
    Value(Value),
    /// A promise-native host settles through this future instead of a callback.
    Promise(BoxFuture<'static, Result<Value, HostError>>),
}

impl fmt::Debug for HostReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostReturn::Value(v) => f.debug_tuple("Value").field(v).finish(),
            HostReturn::Promise(_) => f.write_str("Promise(..)"),
        }
    }
}

/// A callable member of a host namespace.
pub trait HostFunction: Send + Sync {
    /// Invoke the method. `callback`, when present, is appended as the trailing argument.
    fn call(
        &self,
        args: Vec<Value>,
        callback: Option<HostCallback>,
    ) -> Result<HostReturn, HostError>;
}

/// An `onX` event object.
pub trait HostEvent: Send + Sync {
    fn add_listener(&self, listener: EventListener);
}

/// A host namespace (or any nested object inside one).
pub trait HostObject: Send + Sync {
    fn get(&self, name: &str) -> Option<HostValue>;

    fn set(&self, name: &str, value: HostValue);

    fn delete(&self, name: &str) -> bool;

    fn keys(&self) -> Vec<String>;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// A property value read from a host namespace.
#[derive(Clone)]
pub enum HostValue {
    Data(Value),
    Function(Arc<dyn HostFunction>),
    Object(Arc<dyn HostObject>),
    Event(Arc<dyn HostEvent>),
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Data(v) => f.debug_tuple("Data").field(v).finish(),
            HostValue::Function(_) => f.write_str("Function(..)"),
            HostValue::Object(_) => f.write_str("Object(..)"),
            HostValue::Event(_) => f.write_str("Event(..)"),
        }
    }
}

/// Handle to the host's process-wide "last error" slot.
///
/// The host fills the slot right before invoking a callback whose call failed and clears it
/// afterwards; callbacks must inspect it synchronously.
#[derive(Clone, Default)]
pub struct LastError(Arc<Mutex<Option<String>>>);

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, message: impl Into<String>) {
        *lock(&self.0) = Some(message.into());
    }

    pub fn clear(&self) {
        *lock(&self.0) = None;
    }

    pub fn message(&self) -> Option<String> {
        lock(&self.0).clone()
    }
}

impl fmt::Debug for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LastError").field(&self.message()).finish()
    }
}

/// The running host: its namespaces, its manifest and its error slot.
pub trait HostRuntime: Send + Sync {
    fn namespace(&self, name: &str) -> Option<Arc<dyn HostObject>>;

    /// The extension manifest, as `runtime.getManifest()` reports it.
    fn manifest(&self) -> Result<Value, HostError>;

    /// Whether the host exposes the promise-native `browser` global.
    fn promise_global(&self) -> bool;

    fn last_error(&self) -> LastError;
}
