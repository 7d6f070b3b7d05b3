//! hrdesk API client

pub mod auth;
pub mod authenticator;
pub mod error;
pub mod refresher;
pub mod store;

use authenticator::RequestAuthenticator;
use error::ClientError;
use hrdesk_core::Settings;
use refresher::{Refresher, SessionObserver};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use store::{MemoryTokenStore, TokenStore};

/// A request that can be sent more than once
#[derive(Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}

/// hrdesk API client
///
/// Cloning is cheap; clones share the credential store and the renewal
/// slot.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    authenticator: RequestAuthenticator,
    refresher: Refresher,
}

impl ApiClient {
    /// Create a new client with default configuration and an in-memory store
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Build a client from loaded settings
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(&settings.api.base_url)
            .user_agent(&settings.api.user_agent)
            .token_store(store);
        if let Some(timeout) = settings.api.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The credential store shared by this client
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Register the observer told about renewals and forced sign-outs
    pub fn set_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.inner.refresher.set_observer(Some(observer));
    }

    /// Whether a credential renewal is in flight
    pub fn is_renewing(&self) -> bool {
        self.inner.refresher.is_renewing()
    }

    fn build_request(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self.inner.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }
        builder
    }

    /// Send a business request with the stored access credential.
    ///
    /// A 401 answer triggers one renewal (shared with any concurrent
    /// callers) followed by exactly one replay; whatever the replay returns
    /// is final. Transport errors are returned as is.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let (builder, attached) = self
            .inner
            .authenticator
            .authorize(self.build_request(request));
        let response = builder.send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(method = %request.method, path = %request.path, "access credential rejected");
        let access = self
            .inner
            .refresher
            .recover(attached.as_deref())
            .await
            .map_err(|error| {
                debug!(%error, path = %request.path, "request abandoned, session expired");
                ClientError::SessionExpired
            })?;

        debug!(method = %request.method, path = %request.path, "replaying with renewed credential");
        Ok(self.build_request(request).bearer_auth(access).send().await?)
    }

    /// Send a request to a public endpoint: no credential, no renewal
    pub async fn send_public(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        Ok(self.build_request(request).send().await?)
    }

    /// Send a business request and decode the JSON answer
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Send a public request and decode the JSON answer
    pub async fn execute_public<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ClientError> {
        let response = self.send_public(request).await?;
        decode(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(&ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::patch(path).json(body)?).await
    }

    /// Delete a resource; the response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.send(&ApiRequest::delete(path)).await?;
        check(response).await.map(drop)
    }
}

/// Turn a non-success response into an error
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        Err(ClientError::from_status(status, message))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn TokenStore>>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the credential store (defaults to an in-memory store)
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url}: {e}")))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| concat!("hrdesk-client/", env!("CARGO_PKG_VERSION")).to_string());
        client_builder = client_builder.user_agent(user_agent);

        let client = client_builder.build()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                authenticator: RequestAuthenticator::new(Arc::clone(&store)),
                refresher: Refresher::new(client.clone(), &base_url, Arc::clone(&store)),
                client,
                base_url,
                store,
            }),
        })
    }
}
