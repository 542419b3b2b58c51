//! # WebExtension Host API
//!
//! Presents the asynchronous methods of a WebExtension host through one promise-based
//! interface, whether the host itself is callback-last (classic manifest V2 hosts) or
//! promise-native.
//!
//! ## Architecture
//!
//! - **Host Layer** (`api::host`): traits a concrete host binding implements.
//! - **Adapter Layer** (`api::wrapper`, `api::proxy`): wraps callback-last methods so they
//!   return futures, and memoizes the wrapped members per namespace.
//! - **Resolver** (`api::resolver`): detects the host convention once and hands out
//!   adapted or raw namespaces accordingly.
//! - **Test Host** (`api::test`): a scripted in-memory host for unit tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use webext_host_api::prelude::*;
//!
//! let adapter = ApiAdapter::new(runtime);
//! let alarms = adapter.get_proxy_api("alarms", &metadata)?;
//! let all = alarms.invoke("getAll", vec![]).await?;
//! ```

pub mod api;
pub mod error;
pub mod prelude;

pub use api::lock;
pub use api::host::{
    EventListener, HostCallback, HostError, HostEvent, HostFunction, HostObject, HostReturn,
    HostRuntime, HostValue, LastError,
};
pub use api::metadata::{ApiMetadata, ApiMetadataBuilder, MetadataEntry, MethodMetadata, MethodSpec};
pub use api::proxy::{event_name, get_api_event, wrap_api, ApiValue, HostApi, NativeNamespace, ProxyNamespace};
pub use api::resolver::{ApiAdapter, CallConvention, ConventionOverride};
pub use api::test;
pub use api::test::{MockCall, MockHost, MockNamespace, MockReply};
pub use api::wrapper::{bind_function, wrap_async_function, ApiFuture, ApiMethod};
pub use async_trait::async_trait;
pub use error::HostApiError;
pub use serde_json;
