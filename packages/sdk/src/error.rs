use thiserror::Error;
use webext_host_api::HostApiError;

#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error(transparent)]
    Api(#[from] HostApiError),

    /// Domain-level rejection of caller input (missing id/title, bad area or type name).
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The host answered with a record that does not fit the typed model.
    #[error("Unexpected host payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ExtensionError {
    pub fn validation(message: impl Into<String>) -> Self {
        ExtensionError::Validation(message.into())
    }

    /// The host's own message when the failure came through its last-error slot.
    pub fn host_message(&self) -> Option<&str> {
        match self {
            ExtensionError::Api(HostApiError::Runtime { message }) => Some(message.as_str()),
            _ => None,
        }
    }
}

pub type Result<T, E = ExtensionError> = std::result::Result<T, E>;
