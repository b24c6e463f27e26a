//! Scripted [`AuthApi`] for session tests
//!
//! Queued grants or errors are returned first; after that every call
//! succeeds with `token-<n>`, where `n` counts `init_session` calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::Credentials;
use crate::client::api::AuthApi;
use crate::client::models::{ActiveProfile, SessionGrant};
use crate::error::ApiError;

#[derive(Default)]
struct MockState {
    queued: VecDeque<Result<SessionGrant, ApiError>>,
    profile: Option<ActiveProfile>,
    delays: HashMap<usize, Duration>,
    init_calls: usize,
    killed: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockAuthApi {
    state: Arc<Mutex<MockState>>,
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile attached to generated grants
    pub fn with_profile(self, profile: ActiveProfile) -> Self {
        self.state.lock().unwrap().profile = Some(profile);
        self
    }

    /// Make the `call`-th `init_session` (1-based) take `delay`
    pub fn delay_call(self, call: usize, delay: Duration) -> Self {
        self.state.lock().unwrap().delays.insert(call, delay);
        self
    }

    pub fn push_grant(&self, grant: SessionGrant) {
        self.state.lock().unwrap().queued.push_back(Ok(grant));
    }

    pub fn push_error(&self, err: ApiError) {
        self.state.lock().unwrap().queued.push_back(Err(err));
    }

    pub fn init_calls(&self) -> usize {
        self.state.lock().unwrap().init_calls
    }

    /// Tokens passed to `kill_session`, in order
    pub fn killed(&self) -> Vec<String> {
        self.state.lock().unwrap().killed.clone()
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn init_session(&self, _credentials: &Credentials) -> Result<SessionGrant, ApiError> {
        let (result, delay) = {
            let mut state = self.state.lock().unwrap();
            state.init_calls += 1;

            let result = state.queued.pop_front().unwrap_or_else(|| {
                Ok(SessionGrant {
                    profile: state.profile.clone(),
                    ..SessionGrant::new(format!("token-{}", state.init_calls))
                })
            });
            let delay = state
                .delays
                .get(&state.init_calls)
                .copied()
                .unwrap_or_default();
            (result, delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn kill_session(&self, token: &str) -> Result<(), ApiError> {
        self.state.lock().unwrap().killed.push(token.to_string());
        Ok(())
    }
}
