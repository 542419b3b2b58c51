//! Behaviour shared by every entity: namespace and method resolution, event subscription and
//! field projection.
//!
//! Each entity implements [`ExtensionClass`] with its declarations and composes these free
//! functions explicitly.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use webext_host_api::{get_api_event, ApiMetadata, ApiMethod, ApiValue, EventListener, HostApi, HostApiError};

use crate::browser::Browser;
use crate::error::Result;

/// Per-class declarations of an entity.
pub trait ExtensionClass {
    /// Name used in error messages (`'Tab.get()'`).
    const CLASS_NAME: &'static str;
    /// Host namespace the class is backed by.
    const API_NAME: &'static str;
    /// Record keys copied onto instances.
    const FIELDS: &'static [&'static str];

    fn metadata() -> &'static ApiMetadata;
}

pub fn resolve_namespace<C: ExtensionClass>(browser: &Browser) -> Result<Arc<dyn HostApi>> {
    Ok(browser.namespace(C::API_NAME, C::metadata())?)
}

/// The method `name` of the class namespace, ready to call.
pub fn resolve_method<C: ExtensionClass>(browser: &Browser, name: &str) -> Result<ApiMethod> {
    let api = resolve_namespace::<C>(browser)?;
    method_of(api.as_ref(), &format!("{}.{}", C::CLASS_NAME, name), name)
}

/// Resolve and call `name` on the class namespace.
pub async fn invoke<C: ExtensionClass>(browser: &Browser, name: &str, args: Vec<Value>) -> Result<Value> {
    let method = resolve_method::<C>(browser, name)?;
    Ok(method.call(args).await?)
}

/// Look up `name` on `api`; `qualified` names the member in error messages.
pub fn method_of(api: &dyn HostApi, qualified: &str, name: &str) -> Result<ApiMethod> {
    match api.get_property(name) {
        Some(ApiValue::Method(method)) => Ok(method),
        None | Some(ApiValue::Data(Value::Null)) => {
            Err(HostApiError::not_supported(format!("'{qualified}()'")).into())
        }
        Some(_) => Err(HostApiError::NotAFunction(qualified.to_string()).into()),
    }
}

/// Attach `listener` to the class namespace's event for `event_type`.
pub fn subscribe_event<C: ExtensionClass>(
    browser: &Browser,
    event_type: &str,
    listener: EventListener,
) -> Result<()> {
    let api = resolve_namespace::<C>(browser)?;
    get_api_event(api.as_ref(), event_type)?.add_listener(listener);
    Ok(())
}

/// Copy the keys listed in `fields` from `record` onto `target`.
///
/// Absent keys leave the target untouched and keys outside `fields` are never read.
/// A record that is not an object is ignored.
pub fn project_fields<T>(target: &mut T, fields: &[&str], record: &Value) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let Some(record) = record.as_object() else {
        return Ok(());
    };

    let mut current = match serde_json::to_value(&*target)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut changed = false;
    for key in fields {
        if let Some(value) = record.get(*key) {
            current.insert((*key).to_string(), value.clone());
            changed = true;
        }
    }

    if changed {
        *target = serde_json::from_value(Value::Object(current))?;
    }
    Ok(())
}

pub fn from_record<T>(fields: &[&str], record: &Value) -> Result<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut info = T::default();
    project_fields(&mut info, fields, record)?;
    Ok(info)
}

/// Project every element of a host array.
pub fn from_records<T>(fields: &[&str], records: Value) -> Result<Vec<T>>
where
    T: Default + Serialize + DeserializeOwned,
{
    let records: Vec<Value> = serde_json::from_value(records)?;
    records.iter().map(|record| from_record(fields, record)).collect()
}

/// A constant exposed on the class namespace (`TAB_ID_NONE`, `WindowState`, ...).
///
/// Enum-like nested objects are flattened into a JSON object of their data members.
pub fn read_constant<C: ExtensionClass>(browser: &Browser, name: &str) -> Result<Value> {
    let api = resolve_namespace::<C>(browser)?;
    let missing = || HostApiError::not_supported(format!("'{}.{}'", C::CLASS_NAME, name));

    match api.get_property(name) {
        Some(ApiValue::Data(Value::Null)) | None => Err(missing().into()),
        Some(ApiValue::Data(value)) => Ok(value),
        Some(ApiValue::Namespace(nested)) => {
            let members = nested
                .keys()
                .into_iter()
                .filter_map(|key| match nested.get_property(&key) {
                    Some(ApiValue::Data(value)) => Some((key, value)),
                    _ => None,
                })
                .collect::<Map<String, Value>>();
            Ok(Value::Object(members))
        }
        Some(_) => Err(missing().into()),
    }
}
