//! One execution of an operation, from its variables to its last settlement.

use std::sync::Arc;

use cache_config::CachePolicy;
use normalized_cache::{
    coerce::{coerce_selection, Direction},
    OperationKind, ReadOutcome, RecordId, SelectionDocument,
};
use runtime::{
    fetch::FetchRequest,
    hooks::{ErrorDisposition, LoadContext, LoadHooks},
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    client::ClientInner,
    error::ClientError,
    options::Variables,
    response::{parse_response, QueryResult, ResultSource},
};

#[derive(Debug, Clone, Copy, strum::Display)]
enum State {
    ComputingInput,
    CacheRead,
    NetworkFetch,
    Writing,
    Settled,
}

pub(crate) struct Execution {
    pub client: Arc<ClientInner>,
    pub document: Arc<SelectionDocument>,
    pub variables: Variables,
    pub policy: CachePolicy,
    pub partial: bool,
    pub hooks: Arc<dyn LoadHooks>,
    pub cancellation: CancellationToken,
    pub sender: mpsc::UnboundedSender<Result<QueryResult, ClientError>>,
}

impl Execution {
    #[tracing::instrument(skip_all, fields(operation = %self.document.name))]
    pub async fn run(self) {
        self.transition(State::ComputingInput);

        let variables = match self.variables.resolve() {
            Ok(variables) => variables,
            Err(err) => {
                self.fail(&Value::Null, ClientError::Variables(err)).await;
                return;
            }
        };

        if let Err(err) = self.execute(&variables).await {
            self.fail(&variables, err).await;
        }

        self.transition(State::Settled);
        self.client.cache.collect_garbage();
    }

    async fn execute(&self, variables: &Value) -> Result<(), ClientError> {
        let scalars = self.client.cache.scalars();
        // Record keys are computed from the variables as the server sees them.
        let wire_variables = coerce_selection(Direction::Marshal, scalars, &self.document.input, variables.clone())
            .map_err(ClientError::Coercion)?;

        let context = LoadContext {
            operation_name: &self.document.name,
            variables,
        };
        self.hooks.before_load(context).await.map_err(ClientError::Hook)?;

        let policy = match self.document.kind {
            OperationKind::Query => self.policy,
            OperationKind::Mutation | OperationKind::Subscription => CachePolicy::NetworkOnly,
        };

        if policy != CachePolicy::NetworkOnly {
            self.transition(State::CacheRead);

            let outcome = self.client.cache.read(
                &self.document.selection,
                &RecordId::root(),
                &wire_variables,
                self.partial,
            );
            let satisfied = !outcome.has_missing || self.partial;
            let refresh = outcome.has_missing || outcome.stale;

            match policy {
                CachePolicy::CacheOnly if satisfied => return self.settle_from_cache(context, outcome).await,
                CachePolicy::CacheOnly => {
                    return Err(ClientError::IncompleteCache {
                        document: self.document.name.clone(),
                    })
                }
                CachePolicy::CacheOrNetwork if satisfied => {
                    self.settle_from_cache(context, outcome).await?;
                    if !refresh {
                        return Ok(());
                    }
                }
                CachePolicy::CacheAndNetwork if satisfied => self.settle_from_cache(context, outcome).await?,
                _ => {}
            }
        }

        self.fetch(context, &wire_variables).await
    }

    async fn settle_from_cache(&self, context: LoadContext<'_>, outcome: ReadOutcome) -> Result<(), ClientError> {
        self.hooks
            .after_load(context, &outcome.data)
            .await
            .map_err(ClientError::Hook)?;

        self.send(Ok(QueryResult::from_cache(outcome)));
        Ok(())
    }

    async fn fetch(&self, context: LoadContext<'_>, wire_variables: &Value) -> Result<(), ClientError> {
        if self.cancellation.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        self.transition(State::NetworkFetch);

        let request = FetchRequest {
            operation_name: &self.document.name,
            query: &self.document.source,
            variables: wire_variables,
            headers: self.client.headers.clone(),
            timeout: self.client.timeout,
        };

        let response = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => return Err(ClientError::Cancelled),
            response = self.client.fetcher.post(request) => response.map_err(ClientError::NetworkFailure)?,
        };

        let (data, errors) = parse_response(&response.bytes)?;
        let data = data
            .map(|data| {
                coerce_selection(
                    Direction::Unmarshal,
                    self.client.cache.scalars(),
                    &self.document.selection,
                    data,
                )
            })
            .transpose()
            .map_err(ClientError::Coercion)?;

        if self.cancellation.is_cancelled() {
            tracing::warn!("discarding the response of a cancelled execution");
            return Err(ClientError::Cancelled);
        }

        if let Some(data) = &data {
            self.transition(State::Writing);
            self.client
                .cache
                .write(&self.document.selection, data, &RecordId::root(), wire_variables)
                .map_err(ClientError::Cache)?;
        }

        let data = data.unwrap_or_default();
        self.hooks
            .after_load(context, &data)
            .await
            .map_err(ClientError::Hook)?;

        self.send(Ok(QueryResult::from_network(data, errors)));
        Ok(())
    }

    async fn fail(&self, variables: &Value, error: ClientError) {
        if error == ClientError::Cancelled {
            tracing::debug!("cancelled");
            self.send(Err(error));
            return;
        }

        let context = LoadContext {
            operation_name: &self.document.name,
            variables,
        };

        match self.hooks.on_error(context, &error).await {
            ErrorDisposition::Propagate => self.send(Err(error)),
            ErrorDisposition::Handled => {
                tracing::error!("{error}");
                let source = match error {
                    ClientError::IncompleteCache { .. } => ResultSource::Cache,
                    _ => ResultSource::Network,
                };
                self.send(Ok(QueryResult {
                    data: Value::Null,
                    errors: vec![(&error).into()],
                    source,
                    partial: false,
                    stale: false,
                }));
            }
            ErrorDisposition::Fail(err) => {
                tracing::error!("{error}");
                self.send(Err(ClientError::Hook(err)));
            }
        }
    }

    fn send(&self, result: Result<QueryResult, ClientError>) {
        // Nobody listening anymore means the execution is cancelled, which is checked elsewhere.
        let _ = self.sender.send(result);
    }

    fn transition(&self, state: State) {
        tracing::debug!("{state}");
    }
}
