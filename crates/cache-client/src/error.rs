use normalized_cache::CacheError;
use runtime::{fetch::FetchError, hooks::HookError};
use serde::ser::SerializeMap;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Unknown operation `{0}`")]
    UnknownDocument(String),
    #[error("Could not compute the variables: {0}")]
    Variables(HookError),
    #[error(transparent)]
    Coercion(CacheError),
    #[error("Could not write the response to the cache: {0}")]
    Cache(CacheError),
    #[error("The cache cannot answer `{document}` and the network is not allowed")]
    IncompleteCache { document: String },
    #[error("Request failed: {0}")]
    NetworkFailure(FetchError),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Hook(HookError),
    #[error("The execution was cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::UnknownDocument(_) => ErrorCode::UnknownOperation,
            ClientError::Variables(_) => ErrorCode::VariableError,
            ClientError::Coercion(_) => ErrorCode::ScalarCoercionError,
            ClientError::Cache(_) => ErrorCode::CacheWriteError,
            ClientError::IncompleteCache { .. } => ErrorCode::IncompleteCache,
            ClientError::NetworkFailure(FetchError::Timeout { .. }) => ErrorCode::NetworkTimeout,
            ClientError::NetworkFailure(_) => ErrorCode::NetworkError,
            ClientError::InvalidResponse(_) => ErrorCode::InvalidResponse,
            ClientError::Hook(_) => ErrorCode::HookError,
            ClientError::Cancelled => ErrorCode::Cancelled,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // Reported by the server
    ServerError,
    // Preparation
    UnknownOperation,
    VariableError,
    ScalarCoercionError,
    // Cache
    IncompleteCache,
    CacheWriteError,
    // Transport
    NetworkError,
    NetworkTimeout,
    InvalidResponse,
    // User code
    HookError,
    Cancelled,
}

/// An error as it appears in a settlement, next to the data.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlError {
    pub message: String,
    pub code: ErrorCode,
    pub path: Option<Vec<Value>>,
    pub extensions: Map<String, Value>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        GraphqlError {
            message: message.into(),
            code,
            path: None,
            extensions: Map::new(),
        }
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }
}

impl From<&ClientError> for GraphqlError {
    fn from(error: &ClientError) -> Self {
        GraphqlError::new(error.to_string(), error.code())
    }
}

impl serde::Serialize for GraphqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", &self.message)?;
        if let Some(path) = &self.path {
            map.serialize_entry("path", path)?;
        }

        let mut extensions = self.extensions.clone();
        extensions.insert("code".to_string(), Value::String(self.code.to_string()));
        map.serialize_entry("extensions", &extensions)?;

        map.end()
    }
}

/// The error format of GraphQL responses. The code comes from the extensions when the server set
/// one this client knows about.
#[derive(serde::Deserialize)]
pub(crate) struct WireError {
    message: String,
    #[serde(default)]
    path: Option<Vec<Value>>,
    #[serde(default)]
    extensions: Map<String, Value>,
}

impl From<WireError> for GraphqlError {
    fn from(WireError { message, path, mut extensions }: WireError) -> Self {
        let code = extensions
            .get("code")
            .and_then(Value::as_str)
            .and_then(|code| code.parse().ok());
        if code.is_some() {
            extensions.remove("code");
        }

        GraphqlError {
            message,
            code: code.unwrap_or(ErrorCode::ServerError),
            path,
            extensions,
        }
    }
}
