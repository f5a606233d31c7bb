use std::path::PathBuf;

use anyhow::{Context, Result};
use beehub_catalog::CourseCatalog;
use beehub_core::config::AppConfig;

pub async fn run(config: AppConfig, output: Option<PathBuf>) -> Result<()> {
    let catalog = CourseCatalog::new(config.catalog)?;
    let rows = catalog.courses().await?;

    match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(rows.as_ref())?;
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} course sections to {}", rows.len(), path.display());
        }
        None => println!("Course sections: {}", rows.len()),
    }

    Ok(())
}
