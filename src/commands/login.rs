use anyhow::Result;
use beehub_core::{config::AppConfig, Credentials};
use beehub_session::SessionManager;

pub async fn run(config: AppConfig, credentials: Credentials, print_token: bool) -> Result<()> {
    let session = SessionManager::new(config.portal);
    let token = session.login(credentials).await?;

    match session.login_time().await {
        Some(at) => println!("login ok at {}", at.to_rfc3339()),
        None => println!("login ok"),
    }
    if print_token {
        println!("{}", token);
    }

    session.logout().await;
    Ok(())
}
