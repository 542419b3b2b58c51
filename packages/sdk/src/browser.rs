use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use webext_host_api::{lock, ApiAdapter, ApiMetadata, HostApi, HostApiError, HostRuntime};

use crate::config::SdkConfig;
use crate::entities::storage_area::{StorageArea, StorageAreaType};
use crate::error::Result;

/// Handle to one running host.
///
/// Cheap to clone; clones share the capability decision, the resolved namespaces and the
/// storage area registry.
#[derive(Clone)]
pub struct Browser {
    inner: Arc<BrowserInner>,
}

struct BrowserInner {
    adapter: ApiAdapter,
    config: SdkConfig,
    namespaces: Mutex<HashMap<&'static str, Arc<dyn HostApi>>>,
    storage_areas: Mutex<HashMap<StorageAreaType, Arc<StorageArea>>>,
}

impl Browser {
    pub fn new(runtime: Arc<dyn HostRuntime>) -> Self {
        Self::with_config(runtime, SdkConfig::default())
    }

    pub fn with_config(runtime: Arc<dyn HostRuntime>, config: SdkConfig) -> Self {
        let adapter = ApiAdapter::new(runtime).with_override(config.convention);
        Self {
            inner: Arc::new(BrowserInner {
                adapter,
                config,
                namespaces: Mutex::new(HashMap::new()),
                storage_areas: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn adapter(&self) -> &ApiAdapter {
        &self.inner.adapter
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    /// The namespace `api_name`, adapted with `metadata`. Resolved once per handle.
    pub fn namespace(
        &self,
        api_name: &'static str,
        metadata: &ApiMetadata,
    ) -> std::result::Result<Arc<dyn HostApi>, HostApiError> {
        let mut namespaces = lock(&self.inner.namespaces);
        if let Some(api) = namespaces.get(api_name) {
            return Ok(Arc::clone(api));
        }

        let api = self.inner.adapter.get_proxy_api(api_name, metadata)?;
        tracing::debug!(namespace = api_name, "resolved host namespace");
        namespaces.insert(api_name, Arc::clone(&api));
        Ok(api)
    }

    /// The registered storage area for `area`, built with `init` on first request.
    pub(crate) fn storage_area<F>(&self, area: StorageAreaType, init: F) -> Result<Arc<StorageArea>>
    where
        F: FnOnce() -> Result<StorageArea>,
    {
        let mut registry = lock(&self.inner.storage_areas);
        if let Some(existing) = registry.get(&area) {
            return Ok(Arc::clone(existing));
        }

        let created = Arc::new(init()?);
        tracing::debug!(area = area.as_str(), "registered storage area");
        registry.insert(area, Arc::clone(&created));
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webext_host_api::test::MockHost;
    use webext_host_api::{CallConvention, ConventionOverride};

    #[test]
    fn test_namespaces_are_resolved_once() {
        let host = MockHost::new();
        host.namespace("alarms");
        let browser = Browser::new(Arc::new(host));

        let metadata = ApiMetadata::default();
        let first = browser.namespace("alarms", &metadata).unwrap();
        let second = browser.clone().namespace("alarms", &metadata).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_config_overrides_the_convention() {
        let host = MockHost::new();
        let config = SdkConfig {
            convention: ConventionOverride::Promise,
            ..SdkConfig::default()
        };
        let browser = Browser::with_config(Arc::new(host.clone()), config);

        assert_eq!(browser.adapter().convention().unwrap(), CallConvention::Promise);
        assert_eq!(host.manifest_reads(), 0);
    }

    #[test]
    fn test_missing_namespace_is_not_cached() {
        let host = MockHost::new();
        let browser = Browser::new(Arc::new(host.clone()));

        assert!(browser.namespace("tabs", &ApiMetadata::default()).is_err());

        host.namespace("tabs");
        assert!(browser.namespace("tabs", &ApiMetadata::default()).is_ok());
    }
}
