//! GLPI REST client implementation

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::api::{CategoryApi, DirectoryApi, DocumentApi, FollowupApi, ReportApi, TicketApi};
use super::auth::GlpiAuthenticator;
use super::family::ResourceFamily;
use super::models::{
    Category, CategoryUpdate, Document, Followup, Group, GroupUser, Input, ItemCreated,
    NewCategory, NewTicket, Ticket, TicketActor, TicketDetails, TicketUpdate, Upload, User,
};
use super::request::{RequestOptions, classify_response, guarded};
use super::search::{SearchResponse, TicketFilters};
use crate::cache::{
    CacheTtl, SweeperHandle, TtlCache, build_response_cache, cache_key, scoped_key,
};
use crate::config::{Config, RequestSettings};
use crate::error::{ApiError, AttachError, Result};
use crate::session::SessionProvider;

pub(crate) const SESSION_TOKEN: &str = "Session-Token";
pub(crate) const APP_TOKEN: &str = "App-Token";

/// Listing range used for directory-style resources
const FULL_RANGE: &str = "0-999";

pub(crate) type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

type ApiResult<T> = std::result::Result<T, ApiError>;

pub(crate) fn build_http(config: &Config) -> Result<HttpClient> {
    let http = HttpClient::builder()
        .connect_timeout(config.request.timeout())
        .user_agent(concat!("glpidesk/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))?;
    Ok(http)
}

pub(crate) fn build_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

/// GLPI API client with response caching and session management
pub struct GlpiClient {
    http: HttpClient,
    base_url: String,
    app_token: Option<String>,
    session: SessionProvider,
    cache: TtlCache<Value>,
    limiter: Arc<Limiter>,
    settings: RequestSettings,
    default_ttl: Duration,
    _sweeper: Option<SweeperHandle>,
}

impl GlpiClient {
    /// Build a client around an existing session provider and cache.
    pub fn new(config: &Config, session: SessionProvider, cache: TtlCache<Value>) -> Result<Self> {
        config.validate()?;
        let http = build_http(config)?;
        let limiter = build_limiter(config.request.requests_per_second);
        Ok(Self::with_parts(config, http, limiter, session, cache))
    }

    /// Build the full stack from configuration: authenticator, session
    /// provider, and the configured response cache.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let http = build_http(config)?;
        let limiter = build_limiter(config.request.requests_per_second);

        let auth = GlpiAuthenticator::with_parts(config, http.clone(), Arc::clone(&limiter));
        let session = SessionProvider::new(auth, config.session.clone());
        let cache = build_response_cache(&config.cache);

        Ok(Self::with_parts(config, http, limiter, session, cache))
    }

    fn with_parts(
        config: &Config,
        http: HttpClient,
        limiter: Arc<Limiter>,
        session: SessionProvider,
        cache: TtlCache<Value>,
    ) -> Self {
        // The sweeper needs a runtime; without one expiry stays lazy
        let sweeper = match (
            config.cache.sweep_interval(),
            tokio::runtime::Handle::try_current(),
        ) {
            (Some(every), Ok(_)) => Some(cache.spawn_sweeper(every)),
            _ => None,
        };

        Self {
            http,
            base_url: config.base_url().to_string(),
            app_token: config.app_token.clone(),
            session,
            cache,
            limiter,
            settings: config.request.clone(),
            default_ttl: config.cache.default_ttl(),
            _sweeper: sweeper,
        }
    }

    pub fn session(&self) -> &SessionProvider {
        &self.session
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    /// Sign out and drop every cached response.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.cache.clear();
    }

    // ========================================================================
    // Request primitive
    // ========================================================================

    /// Issue a request and deserialize the JSON response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let value = self.request_value(method, endpoint, options).await?;
        serde_json::from_value(value).map_err(|e| {
            ApiError::InvalidResponse(format!("Unexpected response for {}: {}", endpoint, e))
        })
    }

    /// Issue a request and return the raw JSON.
    ///
    /// GETs go through a cache scoped to the signed-in identity and are
    /// retried on network errors and timeouts. Other methods are sent
    /// exactly once and invalidate the family of `endpoint` once sent.
    pub async fn request_value(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResult<Value> {
        if method == Method::GET {
            self.read(endpoint, &options).await
        } else {
            self.mutate(method, endpoint, &options, &[]).await
        }
    }

    async fn read(&self, endpoint: &str, options: &RequestOptions) -> ApiResult<Value> {
        let endpoint = endpoint.trim_matches('/');
        let scope = self.session.identity().await.ok_or(ApiError::NoSession)?;
        let key = scoped_key(&scope, &cache_key(endpoint, &options.query));

        if !options.bypass_cache
            && let Some(hit) = self.cache.get(&key)
        {
            log::debug!("Cache hit: {}", key);
            return Ok(hit);
        }

        let attempts = self.settings.max_retries + 1;
        let mut attempt = 0;

        let value = loop {
            attempt += 1;
            let (result, _) = self
                .send(Method::GET, endpoint, options, json_request(options))
                .await;
            match result {
                Ok(value) => break value,
                Err(e)
                    if attempt < attempts
                        && e.kind().is_retryable()
                        && !matches!(e, ApiError::Cancelled) =>
                {
                    let backoff = self.settings.retry_backoff() * attempt;
                    log::debug!(
                        "GET {} failed ({}); retry {}/{} in {:?}",
                        endpoint,
                        e,
                        attempt,
                        attempts - 1,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        };

        // A sign-out or identity change while in flight must not seed the new scope
        if self.session.identity().await.as_deref() == Some(scope.as_str()) {
            let ttl = options.ttl.unwrap_or(self.default_ttl);
            self.cache.set(key, value.clone(), ttl);
        }

        Ok(value)
    }

    /// Send a mutation once. Once it left the client, the affected families
    /// are invalidated whatever the outcome, since upstream may have applied it.
    async fn mutate(
        &self,
        method: Method,
        endpoint: &str,
        options: &RequestOptions,
        families: &[ResourceFamily],
    ) -> ApiResult<Value> {
        let endpoint = endpoint.trim_matches('/');
        let (result, sent) = self
            .send(method, endpoint, options, json_request(options))
            .await;

        if sent {
            self.invalidate(ResourceFamily::of_endpoint(endpoint).iter().chain(families));
        }
        result
    }

    /// Authorize, rate-limit and send one request under the request's
    /// timeout and cancellation token.
    ///
    /// The flag reports whether the request was handed to the transport.
    async fn send<F>(
        &self,
        method: Method,
        endpoint: &str,
        options: &RequestOptions,
        build: F,
    ) -> (ApiResult<Value>, bool)
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let timeout = options.timeout.unwrap_or(self.settings.timeout());
        let mut token_used: Option<String> = None;
        let slot = &mut token_used;

        let result = guarded(
            async move {
                let token = self.session.valid_token().await?;
                self.limiter.until_ready().await;

                let url = format!("{}/{}", self.base_url, endpoint);
                log::debug!("{} {}", method, url);

                let mut request = self
                    .http
                    .request(method, &url)
                    .header(SESSION_TOKEN, token.as_str());
                if let Some(app_token) = &self.app_token {
                    request = request.header(APP_TOKEN, app_token);
                }
                *slot = Some(token);

                let response = build(request).send().await?;
                let status = response.status();
                let body = response.text().await?;
                classify_response(status, &body)
            },
            timeout,
            options.cancel.as_ref(),
        )
        .await;

        if let (Err(ApiError::Unauthorized), Some(token)) = (&result, &token_used) {
            self.session
                .flag_refresh_error(token, "GLPI rejected the session token")
                .await;
        }

        (result, token_used.is_some())
    }

    fn invalidate<'a>(&self, families: impl IntoIterator<Item = &'a ResourceFamily>) {
        for family in families {
            let removed = self.cache.invalidate_pattern(family.pattern());
            if removed > 0 {
                log::debug!(
                    "Invalidated {} cached {} responses",
                    removed,
                    family.itemtype()
                );
            }
        }
    }

    // ========================================================================
    // Typed helpers
    // ========================================================================

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        ttl: Duration,
    ) -> ApiResult<T> {
        let options = RequestOptions::new().queries(query.iter().copied()).ttl(ttl);
        self.request(Method::GET, endpoint, options).await
    }

    async fn create<I: Serialize>(
        &self,
        itemtype: &str,
        input: I,
        families: &[ResourceFamily],
    ) -> ApiResult<u64> {
        let options = RequestOptions::new().body(input_body(input)?);
        let value = self.mutate(Method::POST, itemtype, &options, families).await?;
        let created: ItemCreated = serde_json::from_value(value).map_err(|e| {
            ApiError::InvalidResponse(format!("Unexpected response for {}: {}", itemtype, e))
        })?;
        Ok(created.id)
    }

    async fn update<I: Serialize>(
        &self,
        itemtype: &str,
        id: u64,
        input: I,
        families: &[ResourceFamily],
    ) -> ApiResult<()> {
        let options = RequestOptions::new().body(input_body(input)?);
        self.mutate(
            Method::PUT,
            &format!("{}/{}", itemtype, id),
            &options,
            families,
        )
        .await?;
        Ok(())
    }

    async fn purge(&self, itemtype: &str, id: u64, families: &[ResourceFamily]) -> ApiResult<()> {
        let options = RequestOptions::new().query("force_purge", "true");
        self.mutate(
            Method::DELETE,
            &format!("{}/{}", itemtype, id),
            &options,
            families,
        )
        .await?;
        Ok(())
    }

    async fn upload(&self, upload: Upload, owner_id: Option<u64>) -> ApiResult<u64> {
        let mut input = json!({
            "name": upload.filename,
            "_filename": [upload.filename],
        });
        if let Some(owner_id) = owner_id {
            input["users_id"] = json!(owner_id);
        }
        let manifest = json!({ "input": input }).to_string();

        let mut file = Part::bytes(upload.bytes).file_name(upload.filename.clone());
        if let Some(mime) = &upload.mime {
            file = file
                .mime_str(mime)
                .map_err(|e| ApiError::BadRequest(format!("Invalid MIME type {}: {}", mime, e)))?;
        }
        let form = Form::new()
            .text("uploadManifest", manifest)
            .part("filename[0]", file);

        let (result, sent) = self
            .send(Method::POST, "Document", &RequestOptions::new(), |request| {
                request.multipart(form)
            })
            .await;
        if sent {
            self.invalidate(&[ResourceFamily::Document]);
        }

        let created: ItemCreated = serde_json::from_value(result?).map_err(|e| {
            ApiError::InvalidResponse(format!("Unexpected upload response: {}", e))
        })?;
        log::info!("Uploaded document {} ({})", created.id, upload.filename);
        Ok(created.id)
    }

    async fn link(&self, document_id: u64, ticket_id: u64) -> ApiResult<u64> {
        self.create(
            "Document_Item",
            json!({
                "documents_id": document_id,
                "items_id": ticket_id,
                "itemtype": "Ticket",
            }),
            &[ResourceFamily::Document, ResourceFamily::Ticket],
        )
        .await
    }
}

/// JSON content type, query and body from `options`
fn json_request(options: &RequestOptions) -> impl FnOnce(RequestBuilder) -> RequestBuilder + Send {
    let query = options.query.clone();
    let body = options.body.clone();
    move |request| {
        let mut request = request.header(CONTENT_TYPE, "application/json");
        if !query.is_empty() {
            request = request.query(&query);
        }
        match body {
            Some(body) => request.json(&body),
            None => request,
        }
    }
}

/// GLPI wraps created and updated fields in `{"input": ...}`
fn input_body<I: Serialize>(input: I) -> ApiResult<Value> {
    serde_json::to_value(Input::new(input)).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

// ============================================================================
// Resource traits
// ============================================================================

#[async_trait]
impl TicketApi for GlpiClient {
    async fn get_tickets(&self, filters: &TicketFilters) -> Result<Vec<Ticket>> {
        let (endpoint, query) = filters.to_request();
        let options = RequestOptions::new().queries(query).ttl(CacheTtl::TICKETS);

        if endpoint.starts_with("search/") {
            let response: SearchResponse = self.request(Method::GET, &endpoint, options).await?;
            log::debug!("Ticket search matched {} rows", response.totalcount);
            Ok(response.into_tickets()?)
        } else {
            Ok(self.request(Method::GET, &endpoint, options).await?)
        }
    }

    async fn get_ticket(&self, id: u64) -> Result<Ticket> {
        Ok(self
            .get(
                &format!("Ticket/{}", id),
                &[("expand_dropdowns", "true")],
                CacheTtl::TICKETS,
            )
            .await?)
    }

    async fn get_ticket_details(&self, id: u64) -> Result<TicketDetails> {
        let (ticket, followups, documents) = futures::try_join!(
            self.get_ticket(id),
            self.get_followups(id),
            self.get_ticket_documents(id),
        )?;
        Ok(TicketDetails {
            ticket,
            followups,
            documents,
        })
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<u64> {
        let id = self
            .create("Ticket", ticket, &[ResourceFamily::Ticket])
            .await?;
        log::info!("Created ticket {}", id);
        Ok(id)
    }

    async fn update_ticket(&self, id: u64, update: TicketUpdate) -> Result<()> {
        Ok(self
            .update("Ticket", id, update, &[ResourceFamily::Ticket])
            .await?)
    }

    async fn delete_ticket(&self, id: u64) -> Result<()> {
        Ok(self
            .purge(
                "Ticket",
                id,
                &[ResourceFamily::Ticket, ResourceFamily::Followup],
            )
            .await?)
    }

    async fn assign_ticket(&self, ticket_id: u64, user_id: u64) -> Result<u64> {
        Ok(self
            .create(
                "Ticket_User",
                json!({
                    "tickets_id": ticket_id,
                    "users_id": user_id,
                    "type": TicketActor::Assigned.code(),
                }),
                &[ResourceFamily::Ticket],
            )
            .await?)
    }
}

#[async_trait]
impl FollowupApi for GlpiClient {
    async fn get_followups(&self, ticket_id: u64) -> Result<Vec<Followup>> {
        let mut followups: Vec<Followup> = self
            .get(
                &format!("Ticket/{}/ITILFollowup", ticket_id),
                &[("expand_dropdowns", "true"), ("range", FULL_RANGE)],
                CacheTtl::FOLLOWUPS,
            )
            .await?;
        followups.sort_by_key(|f| f.id);
        Ok(followups)
    }

    async fn add_followup(&self, ticket_id: u64, content: &str, is_private: bool) -> Result<u64> {
        Ok(self
            .create(
                "ITILFollowup",
                json!({
                    "itemtype": "Ticket",
                    "items_id": ticket_id,
                    "content": content,
                    "is_private": u8::from(is_private),
                }),
                &[ResourceFamily::Followup, ResourceFamily::Ticket],
            )
            .await?)
    }
}

#[async_trait]
impl DocumentApi for GlpiClient {
    async fn get_ticket_documents(&self, ticket_id: u64) -> Result<Vec<Document>> {
        Ok(self
            .get(
                &format!("Ticket/{}/Document", ticket_id),
                &[("range", FULL_RANGE)],
                CacheTtl::DOCUMENTS,
            )
            .await?)
    }

    async fn upload_document(&self, upload: Upload, owner_id: Option<u64>) -> Result<u64> {
        Ok(self.upload(upload, owner_id).await?)
    }

    async fn link_document_to_ticket(&self, document_id: u64, ticket_id: u64) -> Result<u64> {
        Ok(self.link(document_id, ticket_id).await?)
    }

    async fn attach_to_ticket(
        &self,
        upload: Upload,
        ticket_id: u64,
        owner_id: Option<u64>,
    ) -> Result<u64> {
        let document_id = self
            .upload(upload, owner_id)
            .await
            .map_err(AttachError::UploadFailed)?;

        self.link(document_id, ticket_id).await.map_err(|source| {
            log::warn!(
                "Document {} uploaded but not linked to ticket {}",
                document_id,
                ticket_id
            );
            AttachError::LinkFailed {
                document_id,
                source,
            }
        })?;

        Ok(document_id)
    }
}

#[async_trait]
impl CategoryApi for GlpiClient {
    async fn get_categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .get(
                "ITILCategory",
                &[("range", FULL_RANGE), ("expand_dropdowns", "true")],
                CacheTtl::CATEGORIES,
            )
            .await?)
    }

    async fn get_category(&self, id: u64) -> Result<Category> {
        Ok(self
            .get(
                &format!("ITILCategory/{}", id),
                &[("expand_dropdowns", "true")],
                CacheTtl::CATEGORIES,
            )
            .await?)
    }

    async fn create_category(&self, category: NewCategory) -> Result<u64> {
        Ok(self
            .create("ITILCategory", category, &[ResourceFamily::Category])
            .await?)
    }

    // Tickets embed expanded category names
    async fn update_category(&self, id: u64, update: CategoryUpdate) -> Result<()> {
        Ok(self
            .update(
                "ITILCategory",
                id,
                update,
                &[ResourceFamily::Category, ResourceFamily::Ticket],
            )
            .await?)
    }

    async fn delete_category(&self, id: u64) -> Result<()> {
        Ok(self
            .purge(
                "ITILCategory",
                id,
                &[ResourceFamily::Category, ResourceFamily::Ticket],
            )
            .await?)
    }
}

#[async_trait]
impl DirectoryApi for GlpiClient {
    async fn get_users(&self) -> Result<Vec<User>> {
        Ok(self
            .get("User", &[("range", FULL_RANGE)], CacheTtl::USERS)
            .await?)
    }

    async fn get_user(&self, id: u64) -> Result<User> {
        Ok(self
            .get(&format!("User/{}", id), &[], CacheTtl::USERS)
            .await?)
    }

    async fn get_groups(&self) -> Result<Vec<Group>> {
        Ok(self
            .get("Group", &[("range", FULL_RANGE)], CacheTtl::GROUPS)
            .await?)
    }

    async fn get_group(&self, id: u64) -> Result<Group> {
        Ok(self
            .get(&format!("Group/{}", id), &[], CacheTtl::GROUPS)
            .await?)
    }

    async fn get_group_users(&self, group_id: u64) -> Result<Vec<GroupUser>> {
        Ok(self
            .get(
                &format!("Group/{}/Group_User", group_id),
                &[("range", FULL_RANGE)],
                CacheTtl::GROUPS,
            )
            .await?)
    }
}

impl ReportApi for GlpiClient {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::search::Range;

    #[test]
    fn test_zero_rate_is_clamped() {
        let limiter = build_limiter(0);
        assert!(limiter.check().is_ok());
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let config = Config::default();
        let auth = crate::session::mock::MockAuthApi::new();
        let session = SessionProvider::new(auth, config.session.clone());
        assert!(GlpiClient::new(&config, session, TtlCache::new()).is_err());
    }

    #[tokio::test]
    async fn test_slow_renewal_counts_against_request_timeout() {
        use crate::client::models::SessionGrant;
        use crate::session::mock::MockAuthApi;

        let mut config = Config::new("http://127.0.0.1:9/apirest.php");
        config.request.max_retries = 0;
        let auth = MockAuthApi::new().delay_call(2, Duration::from_secs(5));
        auth.push_grant(SessionGrant {
            expires_at: Some(chrono::Utc::now() + chrono::Duration::seconds(30)),
            ..SessionGrant::new("short-lived")
        });
        let session = SessionProvider::new(auth.clone(), config.session.clone());
        session.authenticate("maria", "pw").await.unwrap();
        let client = GlpiClient::new(&config, session, TtlCache::new()).unwrap();

        // The proactive renewal is now stuck upstream
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(auth.init_calls(), 2);

        let started = std::time::Instant::now();
        let err = client
            .request_value(
                Method::GET,
                "Ticket/1",
                RequestOptions::new().timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(auth.init_calls(), 2);
    }

    #[test]
    fn test_full_range_matches_default_search_range() {
        assert_eq!(Range::default().as_param(), FULL_RANGE);
    }
}
