//! Session lifecycle for the GLPI client
//!
//! [`SessionProvider`] owns the single active session, hands out valid
//! tokens to requests, and refreshes the token shortly before it expires.

pub mod credentials;
#[cfg(test)]
pub mod mock;
pub mod refresh;

use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;

use crate::client::api::AuthApi;
use crate::client::models::{SessionGrant, SessionUser};
use crate::config::SessionSettings;
use crate::error::{ApiError, AuthError};

pub use credentials::Credentials;
pub use refresh::refresh_delay;

/// GLPI profiles treated as administrative
const ADMIN_PROFILES: [&str; 4] = ["super-admin", "admin", "supervisor", "technician"];

/// Authorization level derived from the active GLPI profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn from_profile(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        if ADMIN_PROFILES.contains(&name.as_str()) {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// An authenticated GLPI session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,

    /// Kept in memory only, for proactive renewal
    #[serde(skip)]
    pub(crate) credentials: Option<Credentials>,

    /// Set when the upstream rejected the token; the session is then torn down
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

impl Session {
    /// A session obtained elsewhere, e.g. loaded from disk. It cannot renew itself.
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>, role: Role) -> Self {
        Self {
            token: token.into(),
            expires_at,
            role,
            user: None,
            credentials: None,
            refresh_error: None,
        }
    }

    pub fn with_user(mut self, user: SessionUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Zero once expired
    pub fn time_until_expiry(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the provider holds credentials to renew this session
    pub fn can_renew(&self) -> bool {
        self.credentials.is_some()
    }

    /// Stable name of the signed-in identity; survives token renewal.
    pub fn identity(&self) -> String {
        let identity = match (&self.user, &self.credentials) {
            (Some(user), _) => format!("user:{}", user.id),
            (None, Some(credentials)) => {
                format!("login:{}", credentials.identifier.to_lowercase())
            }
            (None, None) => format!("token:{}", self.token),
        };
        identity.replace('|', "_")
    }
}

/// Where the provider is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    RefreshPending,
    /// Transient; settles to `Unauthenticated`
    RefreshFailed,
}

struct State {
    phase: SessionPhase,
    session: Option<Session>,
    /// Bumped on sign-in, restore and sign-out; renewals only land within one
    generation: u64,
}

/// The one pending refresh task, tagged with the session epoch it serves
#[derive(Default)]
struct Timer {
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

struct Shared {
    auth: Arc<dyn AuthApi>,
    settings: SessionSettings,
    state: RwLock<State>,
    timer: std::sync::Mutex<Timer>,
    renew_lock: AsyncMutex<()>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
    }
}

/// Shared handle to the active session
#[derive(Clone)]
pub struct SessionProvider {
    shared: Arc<Shared>,
}

impl SessionProvider {
    pub fn new(auth: impl AuthApi + 'static, settings: SessionSettings) -> Self {
        Self::with_shared_auth(Arc::new(auth), settings)
    }

    pub fn with_shared_auth(auth: Arc<dyn AuthApi>, settings: SessionSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                auth,
                settings,
                state: RwLock::new(State {
                    phase: SessionPhase::Unauthenticated,
                    session: None,
                    generation: 0,
                }),
                timer: std::sync::Mutex::new(Timer::default()),
                renew_lock: AsyncMutex::new(()),
            }),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub async fn current(&self) -> Option<Session> {
        self.shared.state.read().await.session.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.shared.state.read().await.phase
    }

    pub async fn role(&self) -> Option<Role> {
        self.shared
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.role)
    }

    /// True when `token` belongs to the current, unexpired session
    pub async fn is_valid(&self, token: &str) -> bool {
        self.shared
            .state
            .read()
            .await
            .session
            .as_ref()
            .is_some_and(|s| s.token == token && !s.is_expired())
    }

    /// Identity of the current usable session, without renewing it
    pub async fn identity(&self) -> Option<String> {
        self.shared
            .state
            .read()
            .await
            .session
            .as_ref()
            .filter(|s| !s.is_expired() && s.refresh_error.is_none())
            .map(Session::identity)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Sign in and install the resulting session.
    ///
    /// Upstream detail is logged; callers only see a coarse [`AuthError`].
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Session, AuthError> {
        let credentials = Credentials::new(identifier.trim(), secret);
        credentials.validate(self.shared.settings.allowed_email_domain.as_deref())?;

        self.set_phase(SessionPhase::Authenticating).await;

        match self.shared.auth.init_session(&credentials).await {
            Ok(grant) => {
                let session = self.session_from_grant(grant, credentials);
                log::info!(
                    "Signed in as {:?} (expires {})",
                    session.role,
                    session.expires_at
                );
                let previous = self.install(session.clone()).await;
                if let Some(old) = previous
                    && old.token != session.token
                {
                    self.kill(&old.token).await;
                }
                Ok(session)
            }
            Err(e) => {
                log::warn!("Sign-in failed: {}", e);
                let mut state = self.shared.state.write().await;
                state.phase = if state.session.is_some() {
                    SessionPhase::Authenticated
                } else {
                    SessionPhase::Unauthenticated
                };
                Err(AuthError::from(&e))
            }
        }
    }

    /// Re-authenticate and replace the current token.
    ///
    /// Failure is terminal: the session is signed out and `None` returned.
    pub async fn renew(&self, identifier: &str, secret: &str) -> Option<String> {
        let credentials = Credentials::new(identifier.trim(), secret);
        let _guard = self.shared.renew_lock.lock().await;
        let generation = self.shared.state.read().await.generation;
        self.renew_locked(credentials, generation).await
    }

    /// Token for an outbound request, renewing first when inside the margin.
    pub async fn valid_token(&self) -> Result<String, ApiError> {
        let session = self.current().await.ok_or(ApiError::NoSession)?;

        if session.is_expired() {
            log::info!("Session expired; signing out");
            self.sign_out().await;
            return Err(ApiError::NoSession);
        }
        if session.refresh_error.is_some() {
            return Err(ApiError::NoSession);
        }

        let margin = self.shared.settings.refresh_margin();
        if !session.can_renew() || session.time_until_expiry() > margin {
            return Ok(session.token);
        }

        log::debug!("Session inside refresh margin; renewing before request");
        self.refresh_from(&session).await.ok_or(ApiError::NoSession)
    }

    /// Mark the session holding `token` as rejected upstream and tear it
    /// down promptly. A token that is no longer current is ignored.
    pub async fn flag_refresh_error(&self, token: &str, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.shared.state.write().await;
        let Some(session) = state.session.as_mut() else {
            return;
        };
        if session.token != token {
            log::debug!("Ignoring rejection of a replaced token: {}", reason);
            return;
        }
        if session.refresh_error.is_some() {
            return;
        }
        log::warn!("Session flagged: {}", reason);
        session.refresh_error = Some(reason);
        self.schedule(Duration::ZERO);
    }

    /// Install a previously obtained session, e.g. one persisted across restarts.
    pub async fn restore(&self, session: Session) {
        let previous = self.install(session).await;
        if previous.is_some() {
            log::debug!("Restored session replaced an active one");
        }
    }

    /// Drop the session, closing it upstream on a best-effort basis.
    pub async fn sign_out(&self) {
        let previous = {
            let mut state = self.shared.state.write().await;
            self.cancel_timer();
            state.generation += 1;
            state.phase = SessionPhase::Unauthenticated;
            state.session.take()
        };

        if let Some(session) = previous
            && !session.is_expired()
        {
            self.kill(&session.token).await;
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn set_phase(&self, phase: SessionPhase) {
        self.shared.state.write().await.phase = phase;
    }

    fn session_from_grant(&self, grant: SessionGrant, credentials: Credentials) -> Session {
        let expires_at = grant.expires_at.unwrap_or_else(|| {
            let lifetime = chrono::Duration::from_std(self.shared.settings.lifetime())
                .unwrap_or(chrono::Duration::hours(1));
            Utc::now() + lifetime
        });
        let role = grant
            .profile
            .as_ref()
            .map_or(Role::User, |p| Role::from_profile(&p.name));

        Session {
            token: grant.token,
            expires_at,
            role,
            user: grant.user,
            credentials: Some(credentials),
            refresh_error: None,
        }
    }

    /// Make `session` current under a new generation and arm its refresh timer.
    ///
    /// An already-expired session is not installed; the provider signs out.
    async fn install(&self, session: Session) -> Option<Session> {
        let mut state = self.shared.state.write().await;
        state.generation += 1;

        if session.is_expired() {
            log::info!("Session already expired; signing out");
            self.cancel_timer();
            state.phase = SessionPhase::Unauthenticated;
            return state.session.take();
        }

        self.arm(&session);
        state.phase = SessionPhase::Authenticated;
        state.session.replace(session)
    }

    /// Swap in a renewed session, unless the session changed since `generation`.
    async fn install_renewal(
        &self,
        session: Session,
        generation: u64,
    ) -> Result<Option<Session>, Session> {
        let mut state = self.shared.state.write().await;
        if state.generation != generation {
            return Err(session);
        }

        self.arm(&session);
        state.phase = SessionPhase::Authenticated;
        Ok(state.session.replace(session))
    }

    fn arm(&self, session: &Session) {
        let delay = refresh_delay(
            session.expires_at,
            Utc::now(),
            self.shared.settings.refresh_margin(),
        );
        self.schedule(delay);
    }

    async fn kill(&self, token: &str) {
        if let Err(e) = self.shared.auth.kill_session(token).await {
            log::debug!("killSession failed: {}", e);
        }
    }

    /// Close a renewed-away token once requests already holding it had time to finish.
    async fn retire(&self, previous: Option<Session>, current_token: &str) {
        let Some(old) = previous.filter(|old| old.token != current_token) else {
            return;
        };

        let grace = self.shared.settings.retire_delay();
        if grace.is_zero() {
            self.kill(&old.token).await;
            return;
        }

        let auth = Arc::clone(&self.shared.auth);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(e) = auth.kill_session(&old.token).await {
                log::debug!("Failed to close replaced session: {}", e);
            }
        });
    }

    /// Renew unless someone else already replaced `seen` while we waited.
    async fn refresh_from(&self, seen: &Session) -> Option<String> {
        let _guard = self.shared.renew_lock.lock().await;

        let generation = {
            let state = self.shared.state.read().await;
            match &state.session {
                None => return None,
                Some(current) if current.token != seen.token => {
                    return Some(current.token.clone());
                }
                Some(_) => state.generation,
            }
        };

        let credentials = seen.credentials.clone()?;
        self.renew_locked(credentials, generation).await
    }

    /// Caller holds `renew_lock`. The result is dropped if the session
    /// changed from `generation` while the handshake was in flight.
    async fn renew_locked(&self, credentials: Credentials, generation: u64) -> Option<String> {
        {
            let mut state = self.shared.state.write().await;
            if state.generation == generation && state.session.is_some() {
                state.phase = SessionPhase::RefreshPending;
            }
        }

        match self.shared.auth.init_session(&credentials).await {
            Ok(grant) => {
                let session = self.session_from_grant(grant, credentials);
                let token = session.token.clone();
                match self.install_renewal(session, generation).await {
                    Ok(previous) => {
                        log::debug!("Session renewed");
                        self.retire(previous, &token).await;
                        Some(token)
                    }
                    Err(stale) => {
                        log::info!("Session changed during renewal; discarding renewed token");
                        self.kill(&stale.token).await;
                        None
                    }
                }
            }
            Err(e) => {
                log::warn!("Session renewal failed: {}", e);
                let previous = {
                    let mut state = self.shared.state.write().await;
                    if state.generation != generation {
                        return None;
                    }
                    self.cancel_timer();
                    state.generation += 1;
                    state.phase = SessionPhase::Unauthenticated;
                    state.session.take()
                };
                if let Some(session) = previous
                    && !session.is_expired()
                {
                    self.kill(&session.token).await;
                }
                None
            }
        }
    }

    /// Replace any pending timer with one firing after `delay`.
    fn schedule(&self, delay: Duration) {
        let mut timer = self
            .shared
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        timer.epoch += 1;
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }

        let epoch = timer.epoch;
        let weak = Arc::downgrade(&self.shared);
        timer.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(weak, epoch).await;
        }));
    }

    fn cancel_timer(&self) {
        let mut timer = self
            .shared
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        timer.epoch += 1;
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
    }

    async fn on_timer(&self, epoch: u64) {
        {
            let mut timer = self
                .shared
                .timer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if timer.epoch != epoch {
                return;
            }
            // Detach so rescheduling from this task does not abort it
            timer.handle.take();
        }

        let Some(session) = self.current().await else {
            return;
        };

        if let Some(reason) = &session.refresh_error {
            log::info!("Signing out rejected session: {}", reason);
            self.sign_out().await;
        } else if session.is_expired() {
            log::info!("Session expired; signing out");
            self.sign_out().await;
        } else if !session.can_renew() {
            log::info!("Session cannot be renewed without credentials; signing out");
            self.sign_out().await;
        } else {
            self.refresh_from(&session).await;
        }
    }
}

async fn fire(shared: Weak<Shared>, epoch: u64) {
    if let Some(shared) = shared.upgrade() {
        SessionProvider { shared }.on_timer(epoch).await;
    }
}
