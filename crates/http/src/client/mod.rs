//! Storefront HTTP client
//!
//! [`AuthClient`] sends requests with the stored access token and, when the
//! server answers 401, refreshes the session once and replays the request.

pub mod config;
pub mod error;
pub mod helpers;
pub mod refresh;
pub mod request;
pub mod tokens;

pub use config::{ClientProfile, ClientSettings, FailurePolicy, ProfileKind, TokenKeys};
pub use error::{ClientError, ErrorBody, RefreshError};
pub use helpers::{NormalizingClient, PolicyClient};
pub use refresh::RefreshCoordinator;
pub use request::{RequestBody, RequestDescriptor, RequestOptions, UploadForm, UploadPart};
pub use tokens::{StoredTokens, TokenStore};

use reqwest::cookie::Jar;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::{FileStore, KeyValueStore, MemoryStore};
use tracing::{debug, instrument};
use url::Url;

/// Authenticated API client
///
/// Cheap to clone; clones share the transport, cookie jar, token store and
/// refresh coordinator.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    profile: Arc<ClientProfile>,
    tokens: Arc<dyn TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl AuthClient {
    /// Create a client with in-memory token storage
    pub fn new(base_url: impl Into<String>, profile: ClientProfile) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).profile(profile).build()
    }

    /// Create a new client builder
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::default()
    }

    /// Create a client from loaded settings, with tokens persisted on disk
    ///
    /// Integrations that honor the profile's failure policy should use
    /// [`PolicyClient::from_settings`] instead.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        let storage_path = settings.storage_path.clone().unwrap_or_else(|| {
            FileStore::default_path(match settings.profile {
                ProfileKind::Admin => "admin",
                ProfileKind::Customer => "customer",
            })
        });

        let mut builder = Self::builder()
            .base_url(settings.api_url.clone())
            .profile(settings.profile.profile())
            .storage(Arc::new(FileStore::open(storage_path)));

        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }

        builder.build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Profile this client was built with
    pub fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    /// Token store backing this client
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Refresh coordinator shared by all clones of this client
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Persist the tokens returned by a login call
    pub fn store_session(&self, access: &str, refresh: &str) {
        self.tokens.store_session(access, refresh);
    }

    /// Forget the current session
    pub fn logout(&self) {
        self.tokens.clear();
    }

    /// Helpers that normalize every failure instead of returning errors
    pub fn normalizing(&self) -> NormalizingClient {
        NormalizingClient::new(self.clone())
    }

    /// Helpers following this client's profile failure policy
    pub fn with_policy(&self) -> PolicyClient {
        PolicyClient::new(self.clone())
    }

    /// Send a request, refreshing the session and replaying it once on 401
    ///
    /// Login and registration endpoints, and requests that were already
    /// replayed, get their 401 returned as-is.
    #[instrument(
        name = "http.send",
        skip_all,
        fields(method = %descriptor.method, path = %descriptor.path)
    )]
    pub async fn send(&self, mut descriptor: RequestDescriptor) -> Result<Value, ClientError> {
        let token = self.tokens.access();
        let response = self.dispatch(&descriptor, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || descriptor.retried
            || self.profile.is_excluded(&descriptor.path)
        {
            return read_body(response).await;
        }

        descriptor.retried = true;
        debug!("Access token rejected, refreshing session");

        let fresh = self
            .coordinator
            .acquire_fresh_token(token.as_deref())
            .await?;

        let response = self.dispatch(&descriptor, Some(&fresh)).await?;
        read_body(response).await
    }

    /// Send a request and decode the response body into `T`
    pub async fn send_as<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<T, ClientError> {
        let body = self.send(descriptor).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, descriptor.path);

        let mut headers = descriptor.options.headers.clone();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                ClientError::Configuration("access token is not a valid header value".into())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut request = self
            .client
            .request(descriptor.method.clone(), url)
            .headers(headers);

        if !descriptor.options.query.is_empty() {
            request = request.query(&descriptor.options.query);
        }

        request = match &descriptor.body {
            RequestBody::Empty => request,
            RequestBody::Json(payload) => request.json(payload),
            RequestBody::Multipart(form) => request.multipart(form.to_form()?),
        };

        debug!(
            authenticated = token.is_some(),
            retried = descriptor.retried,
            "Dispatching request"
        );
        Ok(request.send().await?)
    }
}

/// Decode a response: JSON when possible, raw text otherwise, `null` if empty
async fn read_body(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(ClientError::from_status(
            status,
            &String::from_utf8_lossy(&bytes),
        ));
    }

    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

/// Builder for [`AuthClient`]
#[derive(Default)]
pub struct AuthClientBuilder {
    base_url: Option<String>,
    profile: Option<ClientProfile>,
    storage: Option<Arc<dyn KeyValueStore>>,
    tokens: Option<Arc<dyn TokenStore>>,
    coordinator: Option<Arc<RefreshCoordinator>>,
    cookie_jar: Option<Arc<Jar>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl AuthClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the client profile (defaults to the customer profile)
    pub fn profile(mut self, profile: ClientProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Key-value storage the default token store keeps tokens in
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the token store entirely
    pub fn tokens(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Use an existing refresh coordinator
    ///
    /// The coordinator must write to the same token store as the client.
    pub fn coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Share a cookie jar with other clients
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
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

    /// Build the client
    pub fn build(self) -> Result<AuthClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let origin = Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url: {e}")))?;

        let profile = self.profile.unwrap_or_default();
        let jar = self.cookie_jar.unwrap_or_default();

        let mut client_builder = ClientBuilder::new()
            .cookie_provider(jar.clone())
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| concat!("storefront-client/", env!("CARGO_PKG_VERSION")).to_string()),
            );
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder.build()?;

        let tokens = match self.tokens {
            Some(tokens) => tokens,
            None => {
                let storage = self
                    .storage
                    .unwrap_or_else(|| Arc::new(MemoryStore::new()));
                let mut stored = StoredTokens::new(storage, profile.token_keys.clone());
                if profile.cookie_fallback {
                    stored = stored.with_cookie_fallback(jar, origin);
                }
                Arc::new(stored) as Arc<dyn TokenStore>
            }
        };

        let coordinator = match self.coordinator {
            Some(coordinator) => coordinator,
            None => Arc::new(RefreshCoordinator::new(
                client.clone(),
                format!("{base_url}{}", profile.refresh_path),
                &profile.refresh_header,
                tokens.clone(),
            )?),
        };

        Ok(AuthClient {
            client,
            base_url,
            profile: Arc::new(profile),
            tokens,
            coordinator,
        })
    }
}
