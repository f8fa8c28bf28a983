use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use cache_config::{CacheConfig, CachePolicy};
use normalized_cache::{
    coerce::{coerce_selection, Direction},
    Cache, Documents, RecordId,
};
use runtime::{fetch::Fetcher, hooks::LoadHooks};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream, StreamExt};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    error::ClientError,
    execution::Execution,
    options::{ExecuteOptions, Variables},
    response::QueryResult,
};

/// Runs the operations of a set of documents against a shared cache.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub cache: Cache,
    pub documents: Documents,
    pub fetcher: Fetcher,
    pub hooks: Arc<dyn LoadHooks>,
    pub policy: CachePolicy,
    pub partial: bool,
    pub timeout: Duration,
    pub headers: http::HeaderMap,
}

impl Client {
    pub fn builder(cache: Cache, documents: Documents, fetcher: Fetcher) -> ClientBuilder {
        ClientBuilder {
            cache,
            documents,
            fetcher,
            hooks: Arc::new(()),
            policy: CachePolicy::default(),
            partial: false,
            timeout: Duration::from_secs(30),
            headers: http::HeaderMap::new(),
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    pub fn documents(&self) -> &Documents {
        &self.inner.documents
    }

    /// Starts executing the operation `name`.
    ///
    /// The returned stream yields every settlement in order: at most one from the cache, then at
    /// most one from the network. Dropping it cancels the execution, a response arriving
    /// afterwards is not written to the cache. Must be called within a tokio runtime.
    pub fn execute(&self, name: &str, options: ExecuteOptions) -> QueryStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancellation = options
            .cancellation
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();

        let stream = QueryStream {
            receiver: UnboundedReceiverStream::new(receiver),
            _cancel_on_drop: cancellation.clone().drop_guard(),
        };

        let Some(document) = self.inner.documents.get(name) else {
            let _ = sender.send(Err(ClientError::UnknownDocument(name.to_string())));
            return stream;
        };

        let execution = Execution {
            client: self.inner.clone(),
            policy: options.policy.unwrap_or(self.inner.policy),
            partial: options.partial.unwrap_or(self.inner.partial),
            hooks: options.hooks.unwrap_or_else(|| self.inner.hooks.clone()),
            variables: options.variables,
            document,
            cancellation,
            sender,
        };
        tokio::spawn(execution.run());

        stream
    }

    /// Watches the cached data of the operation `name`, without ever going to the network.
    ///
    /// The first item is the current content of the cache, a new one follows every write
    /// changing a field the latest read looked at.
    pub fn subscribe(
        &self,
        name: &str,
        variables: Value,
    ) -> Result<impl Stream<Item = QueryResult> + Unpin + Send, ClientError> {
        let document = self
            .inner
            .documents
            .get(name)
            .ok_or_else(|| ClientError::UnknownDocument(name.to_string()))?;

        let variables = Variables::Static(variables)
            .resolve()
            .map_err(ClientError::Variables)?;
        let variables = coerce_selection(
            Direction::Marshal,
            self.inner.cache.scalars(),
            &document.input,
            variables,
        )
        .map_err(ClientError::Coercion)?;

        let subscription = self.inner.cache.subscribe(
            Arc::new(document.selection.clone()),
            RecordId::root(),
            variables,
            self.inner.partial,
        );

        Ok(subscription.map(QueryResult::from_cache))
    }
}

pub struct ClientBuilder {
    cache: Cache,
    documents: Documents,
    fetcher: Fetcher,
    hooks: Arc<dyn LoadHooks>,
    policy: CachePolicy,
    partial: bool,
    timeout: Duration,
    headers: http::HeaderMap,
}

impl ClientBuilder {
    /// Default policy and partial flag from the configuration.
    #[must_use]
    pub fn config(mut self, config: &CacheConfig) -> Self {
        self.policy = config.default_policy;
        self.partial = config.default_partial;
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: impl LoadHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sent with every request, on top of the ones of the transport.
    #[must_use]
    pub fn headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn build(self) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                cache: self.cache,
                documents: self.documents,
                fetcher: self.fetcher,
                hooks: self.hooks,
                policy: self.policy,
                partial: self.partial,
                timeout: self.timeout,
                headers: self.headers,
            }),
        }
    }
}

/// The settlements of one execution.
pub struct QueryStream {
    receiver: UnboundedReceiverStream<Result<QueryResult, ClientError>>,
    _cancel_on_drop: DropGuard,
}

impl Stream for QueryStream {
    type Item = Result<QueryResult, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}
