use std::sync::Arc;

use anyhow::Result;
use beehub_core::{config::AppConfig, Credentials};
use beehub_session::{ProfileClient, SessionManager};

/// Log in and print the student's profile as JSON.
pub async fn run(config: AppConfig, credentials: Credentials, with_photo: bool) -> Result<()> {
    let session = Arc::new(SessionManager::new(config.portal.clone()));
    session.login(credentials).await?;

    let client = ProfileClient::new(config.profile, &config.portal.user_agent, session.clone())?;
    let mut profile = client.fetch().await?;
    if !with_photo {
        profile.photo_base64.clear();
    }
    println!("{}", serde_json::to_string_pretty(&profile)?);

    session.logout().await;
    Ok(())
}
