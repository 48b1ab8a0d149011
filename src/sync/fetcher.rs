//! Transport used by the synchronizer to poll `GET /sync`.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::dto::sync::{SyncQuery, SyncResponse};

/// Failures of a single poll. The synchronizer logs and drops them.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build sync client")]
    ClientBuilder {
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never produced a response.
    #[error("failed to send sync request for `{session_id}`")]
    RequestSend {
        /// Session being polled.
        session_id: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// A 200 response whose body is not a [`SyncResponse`].
    #[error("failed to decode sync response for `{session_id}`")]
    DecodeResponse {
        /// Session being polled.
        session_id: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
}

/// Source of fresh session state for a polling client.
pub trait StateFetcher: Send + Sync {
    /// `Ok(None)` for any response other than 200, which callers ignore.
    fn fetch(&self, query: SyncQuery) -> BoxFuture<'static, Result<Option<SyncResponse>, FetchError>>;
}

/// [`StateFetcher`] talking to a running server over HTTP.
#[derive(Clone)]
pub struct HttpStateFetcher {
    client: Client,
    base_url: Arc<str>,
}

impl HttpStateFetcher {
    /// Fetcher with a default client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .build()
            .map_err(|source| FetchError::ClientBuilder { source })?;
        Ok(Self::with_client(client, base_url))
    }

    /// Fetcher reusing an existing client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    async fn poll(&self, query: SyncQuery) -> Result<Option<SyncResponse>, FetchError> {
        let url = format!("{}/sync", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|source| FetchError::RequestSend {
                session_id: query.session_id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => response
                .json::<SyncResponse>()
                .await
                .map(Some)
                .map_err(|source| FetchError::DecodeResponse {
                    session_id: query.session_id,
                    source,
                }),
            status => {
                debug!(session_id = %query.session_id, %status, "poll returned no update");
                Ok(None)
            }
        }
    }
}

impl StateFetcher for HttpStateFetcher {
    fn fetch(&self, query: SyncQuery) -> BoxFuture<'static, Result<Option<SyncResponse>, FetchError>> {
        let fetcher = self.clone();
        Box::pin(async move { fetcher.poll(query).await })
    }
}
