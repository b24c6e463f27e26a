//! GLPI session handshake

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use super::api::AuthApi;
use super::glpi::{APP_TOKEN, Limiter, SESSION_TOKEN, build_http, build_limiter};
use super::models::{InitSessionResponse, SessionGrant};
use super::request::{classify_response, guarded};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::session::Credentials;

/// [`AuthApi`] backed by GLPI's `initSession` / `killSession`
pub struct GlpiAuthenticator {
    http: HttpClient,
    base_url: String,
    app_token: Option<String>,
    limiter: Arc<Limiter>,
    timeout: Duration,
}

impl GlpiAuthenticator {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let http = build_http(config)?;
        let limiter = build_limiter(config.request.requests_per_second);
        Ok(Self::with_parts(config, http, limiter))
    }

    /// Share the HTTP client and rate limiter with a [`GlpiClient`](super::GlpiClient)
    pub(crate) fn with_parts(config: &Config, http: HttpClient, limiter: Arc<Limiter>) -> Self {
        Self {
            http,
            base_url: config.base_url().to_string(),
            app_token: config.app_token.clone(),
            limiter,
            timeout: config.request.timeout(),
        }
    }

    async fn call(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<serde_json::Value, ApiError> {
        self.limiter.until_ready().await;

        let request = match &self.app_token {
            Some(app_token) => request.header(APP_TOKEN, app_token),
            None => request,
        };

        guarded(
            async move {
                let response = request.send().await?;
                let status = response.status();
                let body = response.text().await?;
                classify_response(status, &body)
            },
            self.timeout,
            None,
        )
        .await
    }
}

#[async_trait]
impl AuthApi for GlpiAuthenticator {
    async fn init_session(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<SessionGrant, ApiError> {
        let basic = general_purpose::STANDARD.encode(format!(
            "{}:{}",
            credentials.identifier, credentials.secret
        ));

        let request = self
            .http
            .get(format!("{}/initSession", self.base_url))
            .query(&[("get_full_session", "true")])
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Basic {}", basic));

        let value = self.call(request).await?;
        let response: InitSessionResponse = serde_json::from_value(value).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse initSession response: {}", e))
        })?;

        let (profile, user) = match response.session {
            Some(session) => (session.active_profile, session.user),
            None => {
                log::debug!("initSession returned no session block; role claim unavailable");
                (None, None)
            }
        };

        Ok(SessionGrant {
            profile,
            user,
            ..SessionGrant::new(response.session_token)
        })
    }

    async fn kill_session(&self, token: &str) -> std::result::Result<(), ApiError> {
        let request = self
            .http
            .get(format!("{}/killSession", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .header(SESSION_TOKEN, token);

        self.call(request).await.map(|_| ())
    }
}
