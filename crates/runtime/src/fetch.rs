use std::{sync::Arc, time::Duration};

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    AnyError(String),
    #[error("Request for the `{operation_name}` operation timed out")]
    Timeout { operation_name: String },
    #[error("Received an unexpected status code: {0}")]
    InvalidStatusCode(http::StatusCode),
}

impl FetchError {
    pub fn any(error: impl ToString) -> Self {
        FetchError::AnyError(error.to_string())
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

pub struct FetchRequest<'a> {
    pub operation_name: &'a str,
    pub query: &'a str,
    /// Already marshalled to their wire representation.
    pub variables: &'a serde_json::Value,
    pub headers: http::HeaderMap,
    pub timeout: Duration,
}

impl FetchRequest<'_> {
    pub fn json_body(&self) -> String {
        serde_json::json!({
            "operationName": self.operation_name,
            "query": self.query,
            "variables": self.variables,
        })
        .to_string()
    }
}

#[derive(Clone, Debug)]
pub struct FetchResponse {
    pub bytes: Bytes,
}

#[async_trait::async_trait]
pub trait FetcherInner: Send + Sync {
    async fn post(&self, request: FetchRequest<'_>) -> FetchResult<FetchResponse>;
}

#[derive(Clone)]
pub struct Fetcher {
    inner: Arc<dyn FetcherInner>,
}

impl Fetcher {
    pub fn new(fetcher: impl FetcherInner + 'static) -> Fetcher {
        Fetcher {
            inner: Arc::new(fetcher),
        }
    }

    pub async fn post(&self, request: FetchRequest<'_>) -> FetchResult<FetchResponse> {
        let operation_name = request.operation_name.to_string();
        let timeout = request.timeout;

        let timeout = async {
            tokio::time::sleep(timeout).await;
            tracing::debug!("request for `{operation_name}` timed out after {timeout:?}");
            Err(FetchError::Timeout { operation_name })
        };

        let execution = self.inner.post(request);

        tokio::select! {
            result = timeout => { result }
            result = execution => { result }
        }
    }
}

impl std::ops::Deref for Fetcher {
    type Target = dyn FetcherInner;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}
