//! Turns one callback invocation into the settlement of one pending call.

use futures::channel::oneshot;
use serde_json::Value;

use super::host::{HostCallback, LastError};
use super::metadata::MethodSpec;
use crate::error::HostApiError;

/// The settling half of a pending call.
pub type Settle = oneshot::Sender<Result<Value, HostApiError>>;

/// Build the trailing callback for a callback-last host method.
///
/// The host's last-error slot is checked the moment the callback runs; a set slot rejects
/// the call with the host's message.
pub fn make_callback(settle: Settle, spec: MethodSpec, last_error: LastError) -> HostCallback {
    Box::new(move |args: Vec<Value>| {
        let outcome = match last_error.message() {
            Some(message) => Err(HostApiError::Runtime { message }),
            None => Ok(callback_value(args, spec.single_callback_arg)),
        };
        // The caller may have dropped the pending call; nothing is waiting then.
        let _ = settle.send(outcome);
    })
}

/// A single callback argument resolves to itself, several resolve to an array, unless the
/// metadata says otherwise.
pub fn callback_value(args: Vec<Value>, single_callback_arg: Option<bool>) -> Value {
    let single = match single_callback_arg {
        Some(single) => single,
        None => args.len() <= 1,
    };

    if single {
        args.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Array(args)
    }
}
