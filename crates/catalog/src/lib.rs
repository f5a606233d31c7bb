use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use beehub_core::config::CatalogConfig;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// One course section, every field rendered as text.
pub type CourseRow = HashMap<String, String>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("catalog source answered with status {0}")]
    BadStatus(u16),

    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Deserialize)]
struct CourseCode {
    #[serde(rename = "dersBransKodu")]
    code: Option<String>,
}

#[derive(Deserialize)]
struct CourseShard {
    #[serde(rename = "dersProgramList", default)]
    sections: Vec<serde_json::Map<String, Value>>,
}

struct CachedCourses {
    rows: Arc<Vec<CourseRow>>,
    fetched_at: Instant,
}

impl CachedCourses {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Merged course list built from per-subject JSON shards, cached for a short TTL.
pub struct CourseCatalog {
    client: reqwest::Client,
    config: CatalogConfig,
    cache: Mutex<Option<CachedCourses>>,
}

impl CourseCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            cache: Mutex::new(None),
        })
    }

    /// All course rows, served from cache while it is fresh.
    pub async fn courses(&self) -> Result<Arc<Vec<CourseRow>>, CatalogError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(self.config.cache_ttl()) {
                debug!(rows = cached.rows.len(), "serving catalog from cache");
                return Ok(Arc::clone(&cached.rows));
            }
        }

        let rows = Arc::new(self.fetch_all().await?);
        *cache = Some(CachedCourses {
            rows: Arc::clone(&rows),
            fetched_at: Instant::now(),
        });
        Ok(rows)
    }

    async fn fetch_all(&self) -> Result<Vec<CourseRow>, CatalogError> {
        let folder = get_text(&self.client, &self.config.most_recent_url).await?;
        let folder = folder.trim();
        let codes = parse_course_codes(&get_text(&self.client, &self.config.course_codes_url).await?)?;

        let folder_url = self
            .config
            .base_url
            .join(&format!("{folder}/"))
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        info!(folder, shards = codes.len(), "fetching course catalog");

        let mut tasks = JoinSet::new();
        for (index, code) in codes.into_iter().enumerate() {
            let url = folder_url
                .join(&format!("{code}.json"))
                .map_err(|e| CatalogError::Parse(e.to_string()))?;
            let client = self.client.clone();

            tasks.spawn(async move {
                let rows = match get_text(&client, &url).await {
                    Ok(body) => parse_shard(&body),
                    Err(e) => Err(e),
                };
                (index, code, rows)
            });
        }

        let mut shards = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(rows))) => shards.push((index, rows)),
                Ok((_, code, Err(e))) => warn!(code = %code, error = %e, "skipping course shard"),
                Err(e) => warn!(error = %e, "course shard task failed"),
            }
        }

        shards.sort_by_key(|(index, _)| *index);
        let rows: Vec<CourseRow> = shards.into_iter().flat_map(|(_, rows)| rows).collect();
        info!(rows = rows.len(), "course catalog merged");
        Ok(rows)
    }
}

async fn get_text(client: &reqwest::Client, url: &Url) -> Result<String, CatalogError> {
    let resp = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| CatalogError::Transport(e.to_string()))?;

    let status = resp.status().as_u16();
    if status != 200 {
        return Err(CatalogError::BadStatus(status));
    }

    resp.text()
        .await
        .map_err(|e| CatalogError::Transport(e.to_string()))
}

fn parse_course_codes(body: &str) -> Result<Vec<String>, CatalogError> {
    let entries: Vec<CourseCode> =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;
    Ok(entries.into_iter().filter_map(|e| e.code).collect())
}

fn parse_shard(body: &str) -> Result<Vec<CourseRow>, CatalogError> {
    let shard: CourseShard =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;

    Ok(shard
        .sections
        .into_iter()
        .map(|section| {
            section
                .into_iter()
                .map(|(key, value)| (key, stringify(value)))
                .collect()
        })
        .collect())
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
