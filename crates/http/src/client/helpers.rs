//! Per-verb request helpers
//!
//! [`AuthClient`] helpers hand errors back to the caller. [`NormalizingClient`]
//! offers the same helpers but logs every error and turns it into a
//! [`Failure`], for integrations that display failures rather than handle
//! them. [`PolicyClient`] picks between the two from the profile's
//! [`FailurePolicy`].

use super::config::{ClientSettings, FailurePolicy};
use super::request::{RequestDescriptor, RequestOptions, UploadForm};
use super::{AuthClient, ClientError};
use crate::types::Failure;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

impl AuthClient {
    /// POST a JSON payload
    pub async fn post_data<T, B>(
        &self,
        path: &str,
        payload: &B,
        options: RequestOptions,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let descriptor = RequestDescriptor::new(Method::POST, path)
            .options(options)
            .json(payload)?;
        self.send_as(descriptor).await
    }

    /// GET a resource
    pub async fn fetch_data<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let descriptor = RequestDescriptor::new(Method::GET, path).options(options);
        self.send_as(descriptor).await
    }

    /// PUT a JSON payload
    pub async fn edit_data<T, B>(
        &self,
        path: &str,
        payload: &B,
        options: RequestOptions,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let descriptor = RequestDescriptor::new(Method::PUT, path)
            .options(options)
            .json(payload)?;
        self.send_as(descriptor).await
    }

    /// DELETE a resource
    pub async fn delete_data<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let descriptor = RequestDescriptor::new(Method::DELETE, path).options(options);
        self.send_as(descriptor).await
    }

    /// POST a multipart form
    pub async fn upload_image<T: DeserializeOwned>(
        &self,
        path: &str,
        form: UploadForm,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let descriptor = RequestDescriptor::new(Method::POST, path)
            .options(options)
            .multipart(form);
        self.send_as(descriptor).await
    }

    /// DELETE with a JSON body, e.g. a batch of ids
    pub async fn delete_with_data<T, B>(
        &self,
        path: &str,
        payload: &B,
        options: RequestOptions,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let descriptor = RequestDescriptor::new(Method::DELETE, path)
            .options(options)
            .json(payload)?;
        self.send_as(descriptor).await
    }
}

/// Request helpers that never surface raw transport errors
#[derive(Clone)]
pub struct NormalizingClient {
    inner: AuthClient,
}

impl NormalizingClient {
    pub fn new(inner: AuthClient) -> Self {
        Self { inner }
    }

    /// Underlying propagating client
    pub fn inner(&self) -> &AuthClient {
        &self.inner
    }

    /// POST a JSON payload
    pub async fn post_data<T, B>(
        &self,
        path: &str,
        payload: &B,
        options: RequestOptions,
    ) -> Result<T, Failure>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        normalize(path, self.inner.post_data(path, payload, options).await)
    }

    /// GET a resource
    pub async fn fetch_data<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, Failure> {
        normalize(path, self.inner.fetch_data(path, options).await)
    }

    /// PUT a JSON payload
    pub async fn edit_data<T, B>(
        &self,
        path: &str,
        payload: &B,
        options: RequestOptions,
    ) -> Result<T, Failure>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        normalize(path, self.inner.edit_data(path, payload, options).await)
    }

    /// DELETE a resource
    pub async fn delete_data<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, Failure> {
        normalize(path, self.inner.delete_data(path, options).await)
    }

    /// POST a multipart form
    pub async fn upload_image<T: DeserializeOwned>(
        &self,
        path: &str,
        form: UploadForm,
        options: RequestOptions,
    ) -> Result<T, Failure> {
        normalize(path, self.inner.upload_image(path, form, options).await)
    }

    /// DELETE with a JSON body
    pub async fn delete_with_data<T, B>(
        &self,
        path: &str,
        payload: &B,
        options: RequestOptions,
    ) -> Result<T, Failure>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        normalize(path, self.inner.delete_with_data(path, payload, options).await)
    }
}

/// Helpers matching the failure policy of the client's profile
#[derive(Clone)]
pub enum PolicyClient {
    /// Errors reach the caller as [`ClientError`]
    Propagating(AuthClient),
    /// Errors are logged and reach the caller as [`Failure`]
    Normalizing(NormalizingClient),
}

impl PolicyClient {
    /// Wrap `client` according to its profile's failure policy
    pub fn new(client: AuthClient) -> Self {
        match client.profile().failure_policy {
            FailurePolicy::Propagate => Self::Propagating(client),
            FailurePolicy::Normalize => Self::Normalizing(NormalizingClient::new(client)),
        }
    }

    /// Build a client from settings and wrap it for its profile
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        AuthClient::from_settings(settings).map(Self::new)
    }

    /// Policy the helpers follow
    pub fn policy(&self) -> FailurePolicy {
        match self {
            Self::Propagating(_) => FailurePolicy::Propagate,
            Self::Normalizing(_) => FailurePolicy::Normalize,
        }
    }

    /// Underlying client, whatever the policy
    pub fn client(&self) -> &AuthClient {
        match self {
            Self::Propagating(client) => client,
            Self::Normalizing(normalizing) => normalizing.inner(),
        }
    }

    pub fn propagating(&self) -> Option<&AuthClient> {
        match self {
            Self::Propagating(client) => Some(client),
            Self::Normalizing(_) => None,
        }
    }

    pub fn normalizing(&self) -> Option<&NormalizingClient> {
        match self {
            Self::Propagating(_) => None,
            Self::Normalizing(normalizing) => Some(normalizing),
        }
    }
}

impl From<AuthClient> for PolicyClient {
    fn from(client: AuthClient) -> Self {
        Self::new(client)
    }
}

fn normalize<T>(path: &str, result: Result<T, ClientError>) -> Result<T, Failure> {
    result.map_err(|e| {
        warn!(path, error = %e, "Request failed");
        e.to_failure()
    })
}
