//! Per-namespace method metadata.
//!
//! The table is hand-maintained: it lists, for each method that must be adapted, how many
//! arguments it takes and how its callback behaves. Nested tables describe nested
//! namespaces, and the `"*"` entry applies to any nested object that is not listed by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use super::{read, write};

/// Key of the entry applied to unlisted nested objects.
pub const WILDCARD: &str = "*";

/// The arity and callback shape of one host method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    pub min_args: usize,
    pub max_args: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_callback_arg: Option<bool>,
    #[serde(default)]
    pub no_callback: bool,
    #[serde(default)]
    pub fallback_to_no_callback: bool,
}

/// Shared handle over a [`MethodSpec`].
///
/// Clones share the record, so the fallback transition made by one wrapped call is seen by
/// every later call that reads the same metadata.
#[derive(Clone)]
pub struct MethodMetadata(Arc<RwLock<MethodSpec>>);

impl MethodMetadata {
    pub fn new(min_args: usize, max_args: usize) -> Self {
        Self::from_spec(MethodSpec {
            min_args,
            max_args,
            ..MethodSpec::default()
        })
    }

    pub fn from_spec(spec: MethodSpec) -> Self {
        Self(Arc::new(RwLock::new(spec)))
    }

    pub fn single_callback_arg(self, single: bool) -> Self {
        write(&self.0).single_callback_arg = Some(single);
        self
    }

    /// Fire-and-forget method: never called with a callback.
    pub fn no_callback(self) -> Self {
        write(&self.0).no_callback = true;
        self
    }

    /// Callback support varies between hosts and is probed on first use.
    pub fn fallback_to_no_callback(self) -> Self {
        write(&self.0).fallback_to_no_callback = true;
        self
    }

    /// A snapshot of the current record.
    pub fn spec(&self) -> MethodSpec {
        *read(&self.0)
    }

    /// Permanently switch the method to the no-callback form.
    pub(crate) fn settle_no_callback(&self) {
        let mut spec = write(&self.0);
        spec.fallback_to_no_callback = false;
        spec.no_callback = true;
    }

    pub fn ptr_eq(&self, other: &MethodMetadata) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodMetadata").field(&self.spec()).finish()
    }
}

#[derive(Debug, Clone)]
pub enum MetadataEntry {
    Method(MethodMetadata),
    Namespace(ApiMetadata),
}

/// The metadata table of one namespace.
#[derive(Debug, Clone, Default)]
pub struct ApiMetadata {
    entries: Arc<HashMap<String, MetadataEntry>>,
}

impl ApiMetadata {
    pub fn builder() -> ApiMetadataBuilder {
        ApiMetadataBuilder::default()
    }

    /// Parse the JSON form of a table: records with `minArgs`/`maxArgs` are methods, any
    /// other object is a nested table.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        let Some(object) = value.as_object() else {
            return Err(serde::de::Error::custom("metadata table must be a JSON object"));
        };

        let mut builder = Self::builder();
        for (name, entry) in object {
            if entry.get("minArgs").is_some() || entry.get("maxArgs").is_some() {
                let spec: MethodSpec = serde_json::from_value(entry.clone())?;
                builder = builder.method(name, MethodMetadata::from_spec(spec));
            } else {
                builder = builder.namespace(name, Self::from_json(entry)?);
            }
        }
        Ok(builder.build())
    }

    pub fn get(&self, name: &str) -> Option<&MetadataEntry> {
        self.entries.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodMetadata> {
        match self.entries.get(name) {
            Some(MetadataEntry::Method(m)) => Some(m),
            _ => None,
        }
    }

    pub fn namespace(&self, name: &str) -> Option<&ApiMetadata> {
        match self.entries.get(name) {
            Some(MetadataEntry::Namespace(ns)) => Some(ns),
            _ => None,
        }
    }

    pub fn wildcard(&self) -> Option<&ApiMetadata> {
        self.namespace(WILDCARD)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
pub struct ApiMetadataBuilder {
    entries: HashMap<String, MetadataEntry>,
}

impl ApiMetadataBuilder {
    pub fn method(mut self, name: impl Into<String>, metadata: MethodMetadata) -> Self {
        self.entries
            .insert(name.into(), MetadataEntry::Method(metadata));
        self
    }

    pub fn namespace(mut self, name: impl Into<String>, metadata: ApiMetadata) -> Self {
        self.entries
            .insert(name.into(), MetadataEntry::Namespace(metadata));
        self
    }

    pub fn wildcard(self, metadata: ApiMetadata) -> Self {
        self.namespace(WILDCARD, metadata)
    }

    pub fn build(self) -> ApiMetadata {
        ApiMetadata {
            entries: Arc::new(self.entries),
        }
    }
}
