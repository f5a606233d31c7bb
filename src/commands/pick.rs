use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use beehub_core::{config::AppConfig, Credentials, PickRequest};
use beehub_registration::{Orchestrator, PickStream};
use beehub_session::SessionManager;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Log in, run the registration orchestrator, and print each result as a JSON line.
pub async fn run(config: AppConfig, credentials: Credentials, courses: &Path) -> Result<()> {
    let body = std::fs::read_to_string(courses)
        .with_context(|| format!("reading {}", courses.display()))?;
    let request: PickRequest = serde_json::from_str(&body)
        .with_context(|| format!("parsing {}", courses.display()))?;
    if request.courses.is_empty() {
        bail!("no courses to pick in {}", courses.display());
    }

    let session = Arc::new(SessionManager::new(config.portal.clone()));
    session.login(credentials).await?;

    let orchestrator = Arc::new(Orchestrator::new(&config.registration, session.clone())?);
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling registration run");
            on_interrupt.cancel();
        }
    });

    let PickStream { mut results, handle } = orchestrator.spawn_pick(request.courses, cancel);
    while let Some(result) = results.recv().await {
        println!("{}", serde_json::to_string(&result)?);
    }

    let outcome = handle.await??;
    info!(?outcome, "registration run finished");
    session.logout().await;
    Ok(())
}
