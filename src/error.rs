use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, SdkError};
use thiserror::Error;

/// Faults raised while talking to the item store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dynamodb request failed: {0}")]
    Sdk(String),
    #[error("invalid dynamodb request: {0}")]
    Build(#[from] BuildError),
    #[error("item conversion failed: {0}")]
    Conversion(#[from] serde_dynamo::Error),
    #[error("item has no usable `id`")]
    MissingKey,
}

impl<E, R> From<SdkError<E, R>> for StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(err: SdkError<E, R>) -> Self {
        StoreError::Sdk(DisplayErrorContext(&err).to_string())
    }
}

/// Failures seen by the editor's HTTP client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("not authorized, sign in again")]
    Unauthorized,
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures of the identity collaborator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("not signed in")]
    NotSignedIn,
    #[error("identity provider rejected the request: {0}")]
    Provider(String),
}

/// Errors surfaced inline by the item editor.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("field name must not be blank")]
    BlankFieldName,
    #[error("add at least one field before creating an item")]
    EmptyStaging,
    #[error("another change is still being saved")]
    Busy,
    #[error("no item with id `{0}` is loaded")]
    UnknownItem(String),
    #[error("no item is being edited")]
    NotEditing,
    #[error(transparent)]
    Api(#[from] ApiError),
}
