//! Promise-returning wrappers around host methods.

use futures::channel::oneshot;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::callback::make_callback;
use super::host::{HostFunction, HostObject, HostReturn, HostValue, LastError};
use super::metadata::{MethodMetadata, MethodSpec};
use crate::error::{ArityBound, HostApiError};

/// The pending result of an adapted host call.
pub type ApiFuture = BoxFuture<'static, Result<Value, HostApiError>>;

type CallFn = dyn Fn(Vec<Value>) -> ApiFuture + Send + Sync;

/// A promise-returning host method.
///
/// Clones share the underlying closure; [`ApiMethod::ptr_eq`] tells whether two handles are
/// the same wrapped member.
#[derive(Clone)]
pub struct ApiMethod {
    name: Arc<str>,
    call: Arc<CallFn>,
}

impl ApiMethod {
    pub fn new<F>(name: impl Into<Arc<str>>, call: F) -> Self
    where
        F: Fn(Vec<Value>) -> ApiFuture + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the method. Argument validation and the host invocation happen right away;
    /// the returned future only waits for settlement.
    pub fn call(&self, args: Vec<Value>) -> ApiFuture {
        (self.call)(args)
    }

    pub fn ptr_eq(&self, other: &ApiMethod) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.call), Arc::as_ptr(&other.call))
    }
}

impl fmt::Debug for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiMethod").field("name", &self.name).finish()
    }
}

/// Wrap the callback-last method `name` of `target` so it returns a future.
///
/// The method is looked up on `target` at call time. `metadata` is read on every call, so a
/// fallback transition recorded by one call applies to all later ones.
pub fn wrap_async_function(
    target: Arc<dyn HostObject>,
    name: &str,
    metadata: MethodMetadata,
    last_error: LastError,
) -> ApiMethod {
    let method: Arc<str> = name.into();
    let wrapped_name = Arc::clone(&method);

    ApiMethod::new(wrapped_name, move |args| {
        invoke_wrapped(target.as_ref(), &method, &metadata, &last_error, args)
    })
}

/// Bind a host function without adapting its calling convention.
///
/// The function is called without a callback; a host promise is awaited, a plain return
/// value resolves immediately.
pub fn bind_function(name: &str, function: Arc<dyn HostFunction>) -> ApiMethod {
    ApiMethod::new(name, move |args| match function.call(args, None) {
        Ok(HostReturn::Value(value)) => future::ready(Ok(value)).boxed(),
        Ok(HostReturn::Promise(pending)) => pending.map(|r| r.map_err(HostApiError::from)).boxed(),
        Err(error) => future::ready(Err(error.into())).boxed(),
    })
}

pub fn check_arity(name: &str, spec: &MethodSpec, got: usize) -> Result<(), HostApiError> {
    let (bound, limit) = if got < spec.min_args {
        (ArityBound::AtLeast, spec.min_args)
    } else if got > spec.max_args {
        (ArityBound::AtMost, spec.max_args)
    } else {
        return Ok(());
    };

    Err(HostApiError::Arity {
        method: name.to_string(),
        bound,
        limit,
        got,
    })
}

fn invoke_wrapped(
    target: &dyn HostObject,
    name: &Arc<str>,
    metadata: &MethodMetadata,
    last_error: &LastError,
    args: Vec<Value>,
) -> ApiFuture {
    let spec = metadata.spec();

    if let Err(error) = check_arity(name, &spec, args.len()) {
        return future::ready(Err(error)).boxed();
    }

    let function = match target.get(name) {
        Some(HostValue::Function(function)) => function,
        Some(_) => return future::ready(Err(HostApiError::NotAFunction(name.to_string()))).boxed(),
        None => {
            return future::ready(Err(HostApiError::not_supported(format!("'{name}()'")))).boxed()
        }
    };

    if spec.fallback_to_no_callback {
        let (settle, pending) = oneshot::channel();
        let callback = make_callback(settle, spec, last_error.clone());

        return match function.call(args.clone(), Some(callback)) {
            Ok(_) => await_callback(Arc::clone(name), pending),
            Err(error) => {
                tracing::warn!(
                    method = %name,
                    %error,
                    "API method doesn't seem to support the callback parameter, falling back to call it without a callback"
                );

                let outcome = function.call(args, None).map(|_| Value::Null);
                if outcome.is_ok() {
                    metadata.settle_no_callback();
                }
                future::ready(outcome.map_err(HostApiError::from)).boxed()
            }
        };
    }

    if spec.no_callback {
        let outcome = function.call(args, None).map(|_| Value::Null);
        return future::ready(outcome.map_err(HostApiError::from)).boxed();
    }

    let (settle, pending) = oneshot::channel();
    let callback = make_callback(settle, spec, last_error.clone());

    match function.call(args, Some(callback)) {
        Ok(_) => await_callback(Arc::clone(name), pending),
        Err(error) => future::ready(Err(error.into())).boxed(),
    }
}

fn await_callback(
    name: Arc<str>,
    pending: oneshot::Receiver<Result<Value, HostApiError>>,
) -> ApiFuture {
    async move {
        pending
            .await
            .unwrap_or_else(|_| Err(HostApiError::CallbackDropped(name.to_string())))
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::host::{HostCallback, HostError};
    use crate::api::test::MockHost;
    use serde_json::json;

    /// Accepts the callback and drops it without ever calling it.
    struct Silent;

    impl HostFunction for Silent {
        fn call(
            &self,
            _args: Vec<Value>,
            _callback: Option<HostCallback>,
        ) -> Result<HostReturn, HostError> {
            Ok(HostReturn::Value(Value::Null))
        }
    }

    fn target(host: &MockHost) -> Arc<dyn HostObject> {
        Arc::new(host.namespace("tabs"))
    }

    #[tokio::test]
    async fn test_arity_is_checked_before_the_host_is_called() {
        let host = MockHost::new();
        let tabs = host
            .namespace("tabs")
            .method("create", |args| Ok(vec![args[0].clone()]));

        let create = wrap_async_function(
            target(&host),
            "create",
            MethodMetadata::new(1, 1),
            host.last_error(),
        );

        let err = create.call(vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "Expected at least 1 argument for create(), got 0");

        let err = create.call(vec![json!(1), json!(2)]).await.unwrap_err();
        assert_eq!(err.to_string(), "Expected at most 1 argument for create(), got 2");

        assert!(tabs.calls("create").is_empty());

        let created = create.call(vec![json!({"url": "https://a.test/"})]).await;
        assert_eq!(created.unwrap(), json!({"url": "https://a.test/"}));
        assert_eq!(tabs.calls("create").len(), 1);
        assert!(tabs.calls("create")[0].with_callback);
    }

    #[tokio::test]
    async fn test_no_callback_resolves_immediately() {
        let host = MockHost::new();
        let tabs = host
            .namespace("tabs")
            .method("highlight", |_| Ok(vec![json!("ignored")]));

        let highlight = wrap_async_function(
            target(&host),
            "highlight",
            MethodMetadata::new(1, 1).no_callback(),
            host.last_error(),
        );

        assert_eq!(highlight.call(vec![json!({})]).await.unwrap(), Value::Null);
        assert!(!tabs.calls("highlight")[0].with_callback);
    }

    #[tokio::test]
    async fn test_fallback_probe_runs_once() {
        let host = MockHost::new();
        let tabs = host
            .namespace("tabs")
            .method_without_callback("discard", |_| Ok(vec![]));
        let metadata = MethodMetadata::new(0, 1).fallback_to_no_callback();

        let discard =
            wrap_async_function(target(&host), "discard", metadata.clone(), host.last_error());

        assert_eq!(discard.call(vec![json!(3)]).await.unwrap(), Value::Null);
        assert!(metadata.spec().no_callback);
        assert!(!metadata.spec().fallback_to_no_callback);

        discard.call(vec![json!(4)]).await.unwrap();

        let forms: Vec<bool> = tabs
            .calls("discard")
            .iter()
            .map(|call| call.with_callback)
            .collect();
        assert_eq!(forms, vec![true, false, false]);
    }

    #[tokio::test]
    async fn test_synchronous_host_error_rejects() {
        let host = MockHost::new();
        host.namespace("tabs")
            .method_without_callback("remove", |_| Ok(vec![]));

        let remove = wrap_async_function(
            target(&host),
            "remove",
            MethodMetadata::new(1, 1),
            host.last_error(),
        );

        let err = remove.call(vec![json!(1)]).await.unwrap_err();
        assert!(matches!(err, HostApiError::Host(_)));
    }

    #[tokio::test]
    async fn test_dropped_callback_rejects() {
        let host = MockHost::new();
        let tabs = host.namespace("tabs");
        tabs.set("silent", HostValue::Function(Arc::new(Silent)));

        let silent = wrap_async_function(
            target(&host),
            "silent",
            MethodMetadata::new(0, 0),
            host.last_error(),
        );

        let err = silent.call(vec![]).await.unwrap_err();
        assert_eq!(err, HostApiError::CallbackDropped("silent".to_string()));
    }

    #[tokio::test]
    async fn test_missing_method_is_not_supported() {
        let host = MockHost::new();
        host.namespace("tabs");

        let missing = wrap_async_function(
            target(&host),
            "missing",
            MethodMetadata::new(0, 0),
            host.last_error(),
        );

        let err = missing.call(vec![]).await.unwrap_err();
        assert!(matches!(err, HostApiError::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_bind_function_awaits_host_promise() {
        let host = MockHost::promise_native();
        let tabs = host
            .namespace("tabs")
            .method("query", |_| Ok(vec![json!([{"id": 1}])]));

        let Some(HostValue::Function(query)) = tabs.get("query") else {
            panic!("query should be a function");
        };
        let bound = bind_function("query", query);

        assert_eq!(bound.call(vec![json!({})]).await.unwrap(), json!([{"id": 1}]));
        assert!(!tabs.calls("query")[0].with_callback);
    }
}
