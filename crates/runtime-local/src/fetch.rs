use cache_config::FetchConfig;
use http::{HeaderName, HeaderValue};
use runtime::fetch::{FetchError, FetchRequest, FetchResponse, FetchResult, Fetcher, FetcherInner};
use url::Url;

pub struct NativeFetcher {
    client: reqwest::Client,
    url: Url,
    headers: http::HeaderMap,
}

impl NativeFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let headers = config
            .headers
            .iter()
            .map(|(name, value)| {
                let name = HeaderName::try_from(name.as_str()).map_err(FetchError::any)?;
                let value = HeaderValue::try_from(value.as_str()).map_err(FetchError::any)?;
                Ok((name, value))
            })
            .collect::<FetchResult<_>>()?;

        Ok(NativeFetcher {
            client: reqwest::Client::builder()
                .pool_idle_timeout(Some(std::time::Duration::from_secs(5)))
                .build()
                .map_err(FetchError::any)?,
            url: config.url.clone(),
            headers,
        })
    }

    pub fn runtime_fetcher(config: &FetchConfig) -> Result<Fetcher, FetchError> {
        Ok(Fetcher::new(Self::new(config)?))
    }
}

#[async_trait::async_trait]
impl FetcherInner for NativeFetcher {
    async fn post(&self, request: FetchRequest<'_>) -> FetchResult<FetchResponse> {
        tracing::debug!("sending `{}` to {}", request.operation_name, self.url);

        let mut headers = self.headers.clone();
        headers.extend(request.headers.clone());

        let response = self
            .client
            .post(self.url.clone())
            .body(request.json_body())
            .header(http::header::CONTENT_TYPE, "application/json")
            .headers(headers)
            .send()
            .await
            .map_err(FetchError::any)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::InvalidStatusCode(status));
        }

        let bytes = response.bytes().await.map_err(FetchError::any)?;

        Ok(FetchResponse { bytes })
    }
}
