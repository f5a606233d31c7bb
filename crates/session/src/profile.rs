//! Student profile read from the portal's protected JSON endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use beehub_core::config::ProfileConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::SessionError;
use crate::manager::TokenProvider;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("profile endpoint answered with status {0}")]
    BadStatus(u16),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("profile not found")]
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub faculty: String,
    pub department: String,
    pub photo_base64: String,
    /// Year of study, e.g. "3".
    pub class_level: String,
    /// Cumulative GPA with two decimals.
    pub gpa: String,
}

#[derive(Deserialize)]
struct PersonalInfoResponse {
    #[serde(rename = "kisiselBilgiler")]
    info: Option<PersonalInfo>,
}

#[derive(Deserialize)]
struct PersonalInfo {
    #[serde(rename = "adSoyad")]
    full_name: Option<String>,
    #[serde(rename = "ePosta")]
    email: Option<String>,
    #[serde(rename = "fakulteEN")]
    faculty: Option<String>,
    #[serde(rename = "bolumAdiEN")]
    department: Option<String>,
}

#[derive(Deserialize)]
struct PhotoResponse {
    #[serde(rename = "base64Fotograf")]
    photo: Option<String>,
}

#[derive(Deserialize)]
struct AcademicResponse {
    #[serde(rename = "akademikDurum")]
    status: Option<AcademicStatus>,
}

#[derive(Deserialize)]
struct AcademicStatus {
    #[serde(rename = "sinifSeviye")]
    class_level: Option<String>,
    #[serde(rename = "genelNotOrtalamasi")]
    gpa: Option<f64>,
}

/// Bearer-authenticated GET against a profile endpoint, returning the raw body.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch(&self, url: &Url, token: &str) -> Result<Vec<u8>, ProfileError>;
}

pub struct HttpProfileApi {
    client: reqwest::Client,
}

impl HttpProfileApi {
    pub fn new(config: &ProfileConfig, user_agent: &str) -> Result<Self, ProfileError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProfileError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ProfileApi for HttpProfileApi {
    async fn fetch(&self, url: &Url, token: &str) -> Result<Vec<u8>, ProfileError> {
        let resp = self
            .client
            .get(url.as_str())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "profile request failed");
                ProfileError::Transport(e.to_string())
            })?;

        let status = resp.status().as_u16();
        if status != 200 {
            warn!(url = %url, status, "profile endpoint rejected request");
            return Err(ProfileError::BadStatus(status));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ProfileError::Transport(e.to_string()))?;
        debug!(url = %url, bytes = body.len(), "profile response");
        Ok(body.to_vec())
    }
}

/// Reads the logged-in student's profile. The token comes from the provider
/// on every call, so a stale session is renewed before anything is fetched.
pub struct ProfileClient {
    config: ProfileConfig,
    tokens: Arc<dyn TokenProvider>,
    api: Arc<dyn ProfileApi>,
}

impl ProfileClient {
    pub fn new(
        config: ProfileConfig,
        user_agent: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ProfileError> {
        let api = Arc::new(HttpProfileApi::new(&config, user_agent)?);
        Ok(Self::with_api(config, tokens, api))
    }

    pub fn with_api(
        config: ProfileConfig,
        tokens: Arc<dyn TokenProvider>,
        api: Arc<dyn ProfileApi>,
    ) -> Self {
        Self {
            config,
            tokens,
            api,
        }
    }

    pub async fn fetch(&self) -> Result<Profile, ProfileError> {
        let token = self.tokens.token().await?;
        let mut profile = Profile::default();

        let personal: PersonalInfoResponse = self.get(&self.config.personal_info_url, &token).await?;
        match personal.info {
            Some(info) => {
                let (first, last) = split_name(info.full_name.as_deref().unwrap_or_default());
                profile.first_name = first;
                profile.last_name = last;
                profile.email = info.email.unwrap_or_default();
                profile.faculty = info.faculty.unwrap_or_default();
                profile.department = info.department.unwrap_or_default();
            }
            None => warn!("personal info missing from profile response"),
        }

        let photo: PhotoResponse = self.get(&self.config.photo_url, &token).await?;
        profile.photo_base64 = photo.photo.unwrap_or_default();

        let academic: AcademicResponse = self.get(&self.config.academic_status_url, &token).await?;
        if let Some(status) = academic.status {
            profile.class_level = status
                .class_level
                .as_deref()
                .and_then(|level| level.chars().next())
                .map(String::from)
                .unwrap_or_default();
            profile.gpa = status.gpa.map(|gpa| format!("{gpa:.2}")).unwrap_or_default();
        }

        if profile.first_name.is_empty() && profile.last_name.is_empty() {
            return Err(ProfileError::NotFound);
        }

        info!(
            faculty = %profile.faculty,
            class_level = %profile.class_level,
            has_photo = !profile.photo_base64.is_empty(),
            "profile loaded"
        );
        Ok(profile)
    }

    async fn get<T: DeserializeOwned>(&self, url: &Url, token: &str) -> Result<T, ProfileError> {
        let body = self.api.fetch(url, token).await?;
        serde_json::from_slice(&body).map_err(|e| ProfileError::Parse(format!("{url}: {e}")))
    }
}

/// Last word is the surname; everything before it is the given name.
fn split_name(full_name: &str) -> (String, String) {
    let mut words: Vec<&str> = full_name.split_whitespace().collect();
    match words.pop() {
        Some(last) if !words.is_empty() => (words.join(" "), last.to_string()),
        Some(only) => (only.to_string(), String::new()),
        None => (String::new(), String::new()),
    }
}
