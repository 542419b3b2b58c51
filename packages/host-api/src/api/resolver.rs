//! Decides, once per host, whether namespaces need adapting at all.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::host::{HostObject, HostRuntime};
use super::metadata::ApiMetadata;
use super::proxy::{wrap_api, HostApi, NativeNamespace};
use crate::error::HostApiError;

/// How the running host settles asynchronous methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallConvention {
    /// Methods take a trailing callback and report failures through the last-error slot.
    Callback,
    /// Methods return promises natively.
    Promise,
}

/// Optional override of the detected convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConventionOverride {
    #[default]
    Auto,
    Callback,
    Promise,
}

/// Entry point to a host's namespaces.
pub struct ApiAdapter {
    runtime: Arc<dyn HostRuntime>,
    convention_override: ConventionOverride,
    convention: OnceCell<CallConvention>,
}

impl ApiAdapter {
    pub fn new(runtime: Arc<dyn HostRuntime>) -> Self {
        Self {
            runtime,
            convention_override: ConventionOverride::Auto,
            convention: OnceCell::new(),
        }
    }

    pub fn with_override(mut self, convention_override: ConventionOverride) -> Self {
        self.convention_override = convention_override;
        self
    }

    pub fn runtime(&self) -> &Arc<dyn HostRuntime> {
        &self.runtime
    }

    /// The host's convention. Detected on first use; never re-evaluated.
    pub fn convention(&self) -> Result<CallConvention, HostApiError> {
        self.convention.get_or_try_init(|| self.detect()).copied()
    }

    fn detect(&self) -> Result<CallConvention, HostApiError> {
        match self.convention_override {
            ConventionOverride::Callback => return Ok(CallConvention::Callback),
            ConventionOverride::Promise => return Ok(CallConvention::Promise),
            ConventionOverride::Auto => {}
        }

        if self.runtime.promise_global() {
            tracing::debug!("host exposes promise-native APIs");
            return Ok(CallConvention::Promise);
        }

        let manifest = self.runtime.manifest()?;
        let manifest_version = manifest.get("manifest_version").and_then(Value::as_u64);

        // Manifest V3 hosts return promises even without the promise-native global.
        let convention = if manifest_version == Some(2) {
            CallConvention::Callback
        } else {
            CallConvention::Promise
        };

        tracing::debug!(?convention, ?manifest_version, "resolved host calling convention");
        Ok(convention)
    }

    /// The raw namespace `name`.
    pub fn get_api(&self, name: &str) -> Result<Arc<dyn HostObject>, HostApiError> {
        self.try_get_api(name)
            .ok_or_else(|| HostApiError::not_supported(format!("the '{name}' API")))
    }

    /// Like [`ApiAdapter::get_api`], but silent when the namespace is missing.
    pub fn try_get_api(&self, name: &str) -> Option<Arc<dyn HostObject>> {
        self.runtime.namespace(name)
    }

    /// The namespace `name`, adapted with `metadata` when the host needs it.
    pub fn get_proxy_api(
        &self,
        name: &str,
        metadata: &ApiMetadata,
    ) -> Result<Arc<dyn HostApi>, HostApiError> {
        let api = self.get_api(name)?;

        let adapted: Arc<dyn HostApi> = match self.convention()? {
            CallConvention::Callback => {
                wrap_api(api, metadata.clone(), self.runtime.last_error())
            }
            CallConvention::Promise => Arc::new(NativeNamespace::new(api)),
        };
        Ok(adapted)
    }
}
