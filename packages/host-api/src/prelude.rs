pub use crate::api::host::{HostEvent, HostObject, HostRuntime, HostValue};
pub use crate::api::metadata::{ApiMetadata, MethodMetadata};
pub use crate::api::proxy::{get_api_event, ApiValue, HostApi};
pub use crate::api::resolver::{ApiAdapter, CallConvention, ConventionOverride};
pub use crate::api::wrapper::ApiMethod;
pub use crate::error::HostApiError;
