use normalized_cache::ReadOutcome;
use serde_json::Value;

use crate::error::{ClientError, GraphqlError, WireError};

/// Where the data of a settlement comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Network,
}

/// One settlement of a query execution.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryResult {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
    pub source: ResultSource,
    /// Some selected fields were missing from the cache.
    pub partial: bool,
    pub stale: bool,
}

impl QueryResult {
    pub(crate) fn from_cache(outcome: ReadOutcome) -> Self {
        QueryResult {
            data: outcome.data,
            errors: Vec::new(),
            source: ResultSource::Cache,
            partial: outcome.has_missing,
            stale: outcome.stale,
        }
    }

    pub(crate) fn from_network(data: Value, errors: Vec<GraphqlError>) -> Self {
        QueryResult {
            data,
            errors,
            source: ResultSource::Network,
            partial: false,
            stale: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(serde::Deserialize)]
struct WireResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<WireError>,
}

/// The `data` and `errors` of a GraphQL response body.
pub(crate) fn parse_response(bytes: &[u8]) -> Result<(Option<Value>, Vec<GraphqlError>), ClientError> {
    let response: WireResponse =
        serde_json::from_slice(bytes).map_err(|err| ClientError::InvalidResponse(err.to_string()))?;

    let data = response.data.filter(|data| !data.is_null());
    if let Some(data) = &data {
        if !data.is_object() {
            return Err(ClientError::InvalidResponse(format!("expected an object for `data`, got {data}")));
        }
    }

    Ok((data, response.errors.into_iter().map(Into::into).collect()))
}
