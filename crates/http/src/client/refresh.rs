//! Single-flight access token refresh
//!
//! When several requests hit an expired session at once, only the first one
//! calls the refresh endpoint. The others queue behind it and all of them
//! receive the outcome of that one call.

use super::error::{ErrorBody, RefreshError};
use super::tokens::TokenStore;
use super::ClientError;
use crate::types::RefreshTokenResponse;
use reqwest::Client;
use reqwest::header::HeaderName;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

type Waiter = oneshot::Sender<Result<String, RefreshError>>;

enum RefreshState {
    Idle,
    Refreshing(Vec<Waiter>),
}

enum Entry {
    /// A newer token than the one that was rejected is already stored
    Ready(String),
    /// Another task is refreshing; wait for its outcome
    Wait(oneshot::Receiver<Result<String, RefreshError>>),
    /// This task performs the refresh
    Lead,
}

/// Coordinates token refreshes for one client
///
/// Invariants:
/// - at most one refresh call is in flight,
/// - every queued waiter is settled exactly once per refresh attempt,
/// - the waiter queue is empty whenever the coordinator is idle.
pub struct RefreshCoordinator {
    http: Client,
    refresh_url: String,
    refresh_header: HeaderName,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Create a coordinator calling `refresh_url` with the refresh token in
    /// `refresh_header`
    ///
    /// `http` must be a plain transport: the refresh call must not go through
    /// the client's own 401 handling.
    pub fn new(
        http: Client,
        refresh_url: impl Into<String>,
        refresh_header: &str,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, ClientError> {
        let refresh_header = HeaderName::try_from(refresh_header).map_err(|e| {
            ClientError::Configuration(format!("invalid refresh header {refresh_header:?}: {e}"))
        })?;

        Ok(Self {
            http,
            refresh_url: refresh_url.into(),
            refresh_header,
            tokens,
            state: Mutex::new(RefreshState::Idle),
        })
    }

    /// URL of the refresh endpoint
    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }

    /// Whether a refresh call is currently in flight
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state(), RefreshState::Refreshing(_))
    }

    /// Number of requests waiting on the in-flight refresh
    pub fn waiting(&self) -> usize {
        match &*self.state() {
            RefreshState::Refreshing(waiters) => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Obtain an access token newer than `stale`
    ///
    /// `stale` is the token the rejected request was sent with. If storage
    /// already holds a different token, a refresh completed after that request
    /// was sent and its token is returned without a network call. Otherwise
    /// this joins the in-flight refresh or starts one.
    ///
    /// On failure the stored tokens are cleared.
    #[instrument(name = "auth.refresh", skip_all, fields(url = %self.refresh_url))]
    pub async fn acquire_fresh_token(&self, stale: Option<&str>) -> Result<String, RefreshError> {
        match self.enter(stale) {
            Entry::Ready(token) => {
                debug!("Token already refreshed by another request");
                Ok(token)
            }
            Entry::Wait(receiver) => {
                debug!("Refresh in flight, queuing");
                receiver.await.unwrap_or(Err(RefreshError::Abandoned))
            }
            Entry::Lead => {
                let mut guard = SettleGuard {
                    coordinator: self,
                    settled: false,
                };

                let outcome = self.refresh().await;
                if let Err(e) = &outcome {
                    warn!("Token refresh failed, clearing session: {}", e);
                    self.tokens.clear();
                }

                guard.settle(&outcome);
                outcome
            }
        }
    }

    fn enter(&self, stale: Option<&str>) -> Entry {
        let mut state = self.state();
        if let RefreshState::Refreshing(waiters) = &mut *state {
            let (sender, receiver) = oneshot::channel();
            waiters.push(sender);
            return Entry::Wait(receiver);
        }

        if let Some(current) = self.tokens.access()
            && Some(current.as_str()) != stale
        {
            return Entry::Ready(current);
        }

        *state = RefreshState::Refreshing(Vec::new());
        Entry::Lead
    }

    /// Return to idle and hand `outcome` to every queued waiter
    fn release(&self, outcome: &Result<String, RefreshError>) {
        let waiters = match std::mem::replace(&mut *self.state(), RefreshState::Idle) {
            RefreshState::Refreshing(waiters) => waiters,
            RefreshState::Idle => Vec::new(),
        };

        if !waiters.is_empty() {
            debug!("Releasing {} queued requests", waiters.len());
        }
        for waiter in waiters {
            // A waiter whose request was dropped no longer listens
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn refresh(&self) -> Result<String, RefreshError> {
        let Some(refresh_token) = self.tokens.refresh() else {
            return Err(RefreshError::MissingRefreshToken);
        };

        let response = self
            .http
            .post(&self.refresh_url)
            .header(&self.refresh_header, refresh_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = ErrorBody::from_response(status, &text);
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: body.message,
                payload: body.payload,
            });
        }

        let token = serde_json::from_str::<RefreshTokenResponse>(&text)
            .ok()
            .and_then(|body| body.data.access_token)
            .filter(|token| !token.is_empty())
            .ok_or(RefreshError::MissingAccessToken)?;

        self.tokens.set_access(&token);
        info!("Access token refreshed");
        Ok(token)
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        // State is never left half-updated; poisoning is ignored
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Settles the waiters even if the leading task is dropped mid-refresh
struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(&mut self, outcome: &Result<String, RefreshError>) {
        self.settled = true;
        self.coordinator.release(outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Token refresh abandoned before completion");
            self.coordinator.release(&Err(RefreshError::Abandoned));
        }
    }
}
