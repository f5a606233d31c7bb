use std::sync::Arc;

use async_trait::async_trait;
use beehub_core::{config::PortalConfig, Credentials};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::SessionError;
use crate::login::LoginFlow;
use crate::transport::{HttpConnector, PortalConnector};

/// Anything that can hand out a bearer token fresh enough for a protected call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, SessionError>;
}

/// An authenticated portal session.
#[derive(Clone)]
pub struct Session {
    pub token: String,
    pub acquired_at: DateTime<Utc>,
    credentials: Credentials,
}

impl Session {
    fn new(token: String, credentials: Credentials) -> Self {
        Self {
            token,
            acquired_at: Utc::now(),
            credentials,
        }
    }

    pub fn is_stale(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.acquired_at >= max_age
    }
}

/// Owns one user's session and its freshness policy.
///
/// All reads and refreshes serialize through the session lock, so a stale
/// token is re-acquired at most once even when several callers race for it.
pub struct SessionManager {
    connector: Arc<dyn PortalConnector>,
    config: PortalConfig,
    session: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(config: PortalConfig) -> Self {
        let connector = Arc::new(HttpConnector::new(&config));
        Self::with_connector(config, connector)
    }

    pub fn with_connector(config: PortalConfig, connector: Arc<dyn PortalConnector>) -> Self {
        Self {
            connector,
            config,
            session: Mutex::new(None),
        }
    }

    /// Log in, replacing any existing session. A failed login leaves no session behind.
    pub async fn login(&self, credentials: Credentials) -> Result<String, SessionError> {
        let mut guard = self.session.lock().await;
        *guard = None;

        let token = self.authenticate(&credentials).await?;
        *guard = Some(Session::new(token.clone(), credentials));
        Ok(token)
    }

    pub async fn logout(&self) {
        let mut guard = self.session.lock().await;
        if guard.take().is_some() {
            info!("logged out");
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn login_time(&self) -> Option<DateTime<Utc>> {
        self.session.lock().await.as_ref().map(|s| s.acquired_at)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<String, SessionError> {
        let transport = self.connector.connect()?;
        let mut flow = LoginFlow::new(transport.as_ref(), &self.config);

        match flow.run(credentials).await {
            Ok(token) => {
                info!("login succeeded");
                Ok(token)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    steps = flow.context().transitions.len(),
                    "login failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl SessionManager {
    /// Shift the login time back as if the session were `age` old.
    pub async fn backdate(&self, age: chrono::Duration) {
        if let Some(session) = self.session.lock().await.as_mut() {
            session.acquired_at = Utc::now() - age;
        }
    }
}

#[async_trait]
impl TokenProvider for SessionManager {
    async fn token(&self) -> Result<String, SessionError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(SessionError::NotAuthenticated)?;

        if !session.is_stale(self.config.token_max_age(), Utc::now()) {
            return Ok(session.token.clone());
        }

        info!(acquired_at = %session.acquired_at, "token stale, re-authenticating");
        let credentials = session.credentials.clone();
        // On failure the stale session stays put; its token is never handed out.
        let token = self.authenticate(&credentials).await?;
        *guard = Some(Session::new(token.clone(), credentials));
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{self, FakePortal};
    use tracing_test::traced_test;

    fn manager(portal: &FakePortal) -> SessionManager {
        SessionManager::with_connector(fake::portal_config(), Arc::new(portal.clone()))
    }

    fn creds() -> Credentials {
        Credentials::new("student@itu.edu.tr", "secret")
    }

    #[tokio::test]
    async fn test_token_before_login_is_not_authenticated() {
        let portal = FakePortal::standard();
        let manager = manager(&portal);

        assert_eq!(manager.token().await.unwrap_err(), SessionError::NotAuthenticated);
        assert!(portal.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let portal = FakePortal::standard();
        let manager = manager(&portal);

        manager.login(creds()).await.unwrap();
        let after_login = portal.requests().len();

        assert_eq!(manager.token().await.unwrap(), fake::TOKEN);
        assert_eq!(manager.token().await.unwrap(), fake::TOKEN);
        assert_eq!(portal.requests().len(), after_login);
        assert_eq!(portal.connections(), 1);
    }

    #[tokio::test]
    async fn test_stale_token_triggers_full_relogin() {
        let portal = FakePortal::standard();
        let manager = manager(&portal);
        manager.login(creds()).await.unwrap();
        manager.backdate(chrono::Duration::hours(5)).await;

        let before = manager.login_time().await.unwrap();
        assert_eq!(manager.token().await.unwrap(), fake::TOKEN);

        assert_eq!(portal.connections(), 2);
        assert_eq!(portal.requests().len(), 8);
        assert!(manager.login_time().await.unwrap() > before);
    }

    #[tokio::test]
    async fn test_failed_refresh_never_returns_stale_token() {
        let portal = FakePortal::standard();
        let manager = manager(&portal);
        manager.login(creds()).await.unwrap();
        manager.backdate(chrono::Duration::hours(5)).await;

        portal.route_get(fake::JWT, 200, fake::LOGIN_PAGE);
        assert_eq!(manager.token().await.unwrap_err(), SessionError::LoginFailed);
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_failed_login_clears_previous_session() {
        let portal = FakePortal::standard();
        let manager = manager(&portal);
        manager.login(creds()).await.unwrap();

        portal.route_post(fake::LOGIN, 500, "boom");
        let err = manager.login(creds()).await.unwrap_err();

        assert_eq!(err, SessionError::BadStatus(500));
        assert!(!manager.is_authenticated().await);
        assert_eq!(manager.token().await.unwrap_err(), SessionError::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let portal = FakePortal::standard();
        let manager = manager(&portal);
        manager.login(creds()).await.unwrap();

        manager.logout().await;
        assert!(!manager.is_authenticated().await);
        assert!(manager.login_time().await.is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_credentials_stay_out_of_logs() {
        let portal = FakePortal::standard();
        let manager = manager(&portal);

        manager.login(creds()).await.unwrap();
        manager.backdate(chrono::Duration::hours(5)).await;
        manager.token().await.unwrap();
        portal.route_post(fake::LOGIN, 500, "boom");
        manager.login(creds()).await.unwrap_err();
        manager.logout().await;

        assert!(logs_contain("login succeeded"));
        assert!(logs_contain("login failed"));
        assert!(!logs_contain("student@itu.edu.tr"));
        assert!(!logs_contain("secret"));
    }

    #[test]
    fn test_staleness_threshold() {
        let session = Session::new("t".into(), creds());
        let max_age = chrono::Duration::hours(4);

        assert!(!session.is_stale(max_age, session.acquired_at + chrono::Duration::minutes(239)));
        assert!(session.is_stale(max_age, session.acquired_at + chrono::Duration::hours(4)));
    }
}
