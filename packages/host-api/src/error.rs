use crate::api::host::HostError;
use std::fmt;
use thiserror::Error;

/// Which side of a method's declared arity was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityBound {
    AtLeast,
    AtMost,
}

impl fmt::Display for ArityBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArityBound::AtLeast => f.write_str("at least"),
            ArityBound::AtMost => f.write_str("at most"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostApiError {
    /// The namespace, method or event is absent on the running host.
    #[error("Your browser does not support {0}.")]
    NotSupported(String),

    /// The member exists but is not callable.
    #[error("'{0}' is not a function")]
    NotAFunction(String),

    #[error("Expected {bound} {limit} {} for {method}(), got {got}", pluralize_arguments(.limit))]
    Arity {
        method: String,
        bound: ArityBound,
        limit: usize,
        got: usize,
    },

    /// The host reported a failure through its last-error slot.
    #[error("{message}")]
    Runtime { message: String },

    /// The host threw synchronously while the method was being invoked.
    #[error("Host call failed: {0}")]
    Host(#[from] HostError),

    #[error("The host dropped the callback of {0}() without settling it")]
    CallbackDropped(String),
}

impl HostApiError {
    pub fn not_supported(what: impl fmt::Display) -> Self {
        HostApiError::NotSupported(what.to_string())
    }

    /// True for errors that surfaced through the host's last-error slot.
    pub fn is_runtime(&self) -> bool {
        matches!(self, HostApiError::Runtime { .. })
    }
}

fn pluralize_arguments(count: &usize) -> &'static str {
    if *count == 1 {
        "argument"
    } else {
        "arguments"
    }
}
