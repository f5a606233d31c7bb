use beehub_core::{config::PortalConfig, Credentials};
use beehub_parser::{contains_form, find_active_identity, hidden_inputs};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::transport::{PortalResponse, PortalTransport};

const FIELD_EVENT_TARGET: &str = "__EVENTTARGET";
const FIELD_EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
const FIELD_VIEW_STATE: &str = "__VIEWSTATE";
const FIELD_APP_NAME: &str = "ctl00$ContentPlaceHolder1$hfAppName";
const FIELD_USERNAME: &str = "ctl00$ContentPlaceHolder1$tbUserName";
const FIELD_PASSWORD: &str = "ctl00$ContentPlaceHolder1$tbPassword";
const FIELD_LOGIN_BUTTON: &str = "ctl00$ContentPlaceHolder1$btnLogin";

const APP_NAME: &str = "Öğrenci Bilgi Sistemi";
const LOGIN_BUTTON: &str = "Giriş / Login";

/// Login progress. `TokenAcquired` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    LoggedOut,
    LoginPageFetched,
    CredentialsSubmitted,
    IdentitySelected,
    TokenAcquired,
    Failed(SessionError),
}

#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: LoginState,
    pub to: LoginState,
    pub at: DateTime<Utc>,
}

/// Record of one login attempt.
#[derive(Debug)]
pub struct LoginContext {
    pub state: LoginState,
    pub transitions: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
}

impl LoginContext {
    pub fn new() -> Self {
        Self {
            state: LoginState::LoggedOut,
            transitions: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, new_state: LoginState) {
        let old_state = std::mem::replace(&mut self.state, new_state);
        debug!(from = ?old_state, to = ?self.state, "login transition");

        self.transitions.push(StateTransition {
            from: old_state,
            to: self.state.clone(),
            at: Utc::now(),
        });
    }

    pub fn path(&self) -> Vec<&LoginState> {
        self.transitions.iter().map(|t| &t.to).collect()
    }
}

impl Default for LoginContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the portal's login sequence over one transport.
pub struct LoginFlow<'a> {
    transport: &'a dyn PortalTransport,
    config: &'a PortalConfig,
    context: LoginContext,
}

impl<'a> LoginFlow<'a> {
    pub fn new(transport: &'a dyn PortalTransport, config: &'a PortalConfig) -> Self {
        Self {
            transport,
            config,
            context: LoginContext::new(),
        }
    }

    pub fn context(&self) -> &LoginContext {
        &self.context
    }

    /// Run the sequence to a terminal state and return the bearer token.
    pub async fn run(&mut self, credentials: &Credentials) -> Result<String, SessionError> {
        let result = self.drive(credentials).await;
        if let Err(e) = &result {
            self.context.transition(LoginState::Failed(e.clone()));
        }
        result
    }

    async fn drive(&mut self, credentials: &Credentials) -> Result<String, SessionError> {
        // The login URL is generated per visit; only the redirect target knows it.
        let landing = self.transport.get(&self.config.root_url).await?;
        let login_url = landing.final_url;

        let login_page = expect_success(self.transport.get(&login_url).await?)?;
        self.context.transition(LoginState::LoginPageFetched);

        let form = login_form(&login_page.body, credentials)?;
        let submitted = expect_success(self.transport.post_form(&login_url, &form).await?)?;
        self.context.transition(LoginState::CredentialsSubmitted);

        if submitted.body.contains(&self.config.identity_marker) {
            let identity = find_active_identity(&submitted.body, &submitted.final_url)
                .ok_or(SessionError::NoActiveIdentity)?;
            info!(student_number = %identity.student_number, "selecting active identity");

            let url = identity.selection_url(&self.config.identity_select_url);
            expect_success(self.transport.get(&url).await?)?;
            self.context.transition(LoginState::IdentitySelected);
        }

        let token_resp = expect_success(self.transport.get(&self.config.token_url).await?)?;
        // A login page instead of a token means the credentials were rejected.
        if contains_form(&token_resp.body) {
            return Err(SessionError::LoginFailed);
        }

        let token = token_resp.body.trim().to_string();
        if token.is_empty() {
            return Err(SessionError::LoginFailed);
        }

        self.context.transition(LoginState::TokenAcquired);
        Ok(token)
    }
}

fn expect_success(resp: PortalResponse) -> Result<PortalResponse, SessionError> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(SessionError::BadStatus(resp.status))
    }
}

/// Build the URL-encoded login submission from the served login page.
pub(crate) fn login_form(
    page: &str,
    credentials: &Credentials,
) -> Result<Vec<(String, String)>, SessionError> {
    let hidden = hidden_inputs(page);
    if !hidden.contains_key(FIELD_VIEW_STATE) {
        return Err(SessionError::Parse(format!(
            "login page carries no {FIELD_VIEW_STATE} field"
        )));
    }

    let fixed = [
        FIELD_EVENT_TARGET,
        FIELD_EVENT_ARGUMENT,
        FIELD_APP_NAME,
        FIELD_USERNAME,
        FIELD_PASSWORD,
        FIELD_LOGIN_BUTTON,
    ];
    let mut scraped: Vec<(String, String)> = hidden
        .into_iter()
        .filter(|(name, _)| !fixed.contains(&name.as_str()))
        .collect();
    scraped.sort();

    let mut form = vec![
        (FIELD_EVENT_TARGET.to_string(), String::new()),
        (FIELD_EVENT_ARGUMENT.to_string(), String::new()),
    ];
    form.extend(scraped);
    form.push((FIELD_APP_NAME.to_string(), APP_NAME.to_string()));
    form.push((FIELD_USERNAME.to_string(), credentials.email.clone()));
    form.push((FIELD_PASSWORD.to_string(), credentials.password.clone()));
    form.push((FIELD_LOGIN_BUTTON.to_string(), LOGIN_BUTTON.to_string()));
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{self, FakePortal};
    use crate::transport::PortalConnector;

    fn creds() -> Credentials {
        Credentials::new("student@itu.edu.tr", "secret")
    }

    async fn run(portal: &FakePortal) -> (Result<String, SessionError>, Vec<LoginState>) {
        let config = fake::portal_config();
        let transport = portal.connect().unwrap();
        let mut flow = LoginFlow::new(transport.as_ref(), &config);
        let result = flow.run(&creds()).await;
        let path = flow.context().path().into_iter().cloned().collect();
        (result, path)
    }

    #[test]
    fn test_login_form_fields() {
        let form = login_form(fake::LOGIN_PAGE, &creds()).unwrap();
        let get = |k: &str| form.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());

        assert_eq!(form[0], ("__EVENTTARGET".to_string(), String::new()));
        assert_eq!(get("__VIEWSTATE"), Some("dDwtMTA4"));
        assert_eq!(get("__EVENTVALIDATION"), Some("/wEdAAU"));
        assert_eq!(get(FIELD_APP_NAME), Some(APP_NAME));
        assert_eq!(get(FIELD_USERNAME), Some("student@itu.edu.tr"));
        assert_eq!(get(FIELD_PASSWORD), Some("secret"));
        assert_eq!(form.iter().filter(|(n, _)| n == FIELD_APP_NAME).count(), 1);
    }

    #[test]
    fn test_login_form_requires_view_state() {
        let err = login_form("<form><input type='text' name='x'/></form>", &creds()).unwrap_err();
        assert!(matches!(err, SessionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_plain_login_acquires_token() {
        let portal = FakePortal::standard();
        let (result, path) = run(&portal).await;

        assert_eq!(result.unwrap(), fake::TOKEN);
        assert_eq!(
            path,
            vec![
                LoginState::LoginPageFetched,
                LoginState::CredentialsSubmitted,
                LoginState::TokenAcquired,
            ]
        );
        assert_eq!(
            portal.requests(),
            vec![
                format!("GET {}", fake::ROOT),
                format!("GET {}", fake::LOGIN),
                format!("POST {}", fake::LOGIN),
                format!("GET {}", fake::JWT),
            ]
        );
    }

    #[tokio::test]
    async fn test_identity_selection_adds_one_get_before_token() {
        let portal = FakePortal::standard();
        portal.route_post(fake::LOGIN, 200, &fake::identity_page("Active"));
        portal.route_get(&fake::selection_url(), 200, "<html>ok</html>");

        let (result, path) = run(&portal).await;

        assert_eq!(result.unwrap(), fake::TOKEN);
        assert!(path.contains(&LoginState::IdentitySelected));
        assert_eq!(
            portal.requests(),
            vec![
                format!("GET {}", fake::ROOT),
                format!("GET {}", fake::LOGIN),
                format!("POST {}", fake::LOGIN),
                format!("GET {}", fake::selection_url()),
                format!("GET {}", fake::JWT),
            ]
        );
    }

    #[tokio::test]
    async fn test_identity_page_without_active_card_fails() {
        let portal = FakePortal::standard();
        portal.route_post(fake::LOGIN, 200, &fake::identity_page("Inactive"));

        let (result, path) = run(&portal).await;

        assert_eq!(result.unwrap_err(), SessionError::NoActiveIdentity);
        assert_eq!(path.last(), Some(&LoginState::Failed(SessionError::NoActiveIdentity)));
        assert!(!portal.requests().iter().any(|r| r.ends_with(fake::JWT)));
    }

    #[tokio::test]
    async fn test_reserved_login_page_means_login_failed() {
        let portal = FakePortal::standard();
        portal.route_get(fake::JWT, 200, fake::LOGIN_PAGE);

        let (result, _) = run(&portal).await;
        assert_eq!(result.unwrap_err(), SessionError::LoginFailed);
    }

    #[tokio::test]
    async fn test_non_2xx_submission_is_bad_status() {
        let portal = FakePortal::standard();
        portal.route_post(fake::LOGIN, 503, "unavailable");

        let (result, path) = run(&portal).await;
        assert_eq!(result.unwrap_err(), SessionError::BadStatus(503));
        assert_eq!(path, vec![
            LoginState::LoginPageFetched,
            LoginState::Failed(SessionError::BadStatus(503)),
        ]);
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let portal = FakePortal::standard();
        portal.remove_get(fake::JWT);

        let (result, _) = run(&portal).await;
        assert!(matches!(result.unwrap_err(), SessionError::Transport(_)));
    }
}
