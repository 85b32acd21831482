use std::{env, path::Path};

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::config::Config;

async fn download_file(url: &str, path: &str) -> Result<()> {
    tracing::info!("Downloading {} from {}", path, url);

    let mut header_map = HeaderMap::new();

    if let Ok(token) = env::var("GITHUB_TOKEN") {
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Invalid GITHUB_TOKEN format")?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));

    let response = reqwest::Client::new()
        .get(url)
        .headers(header_map)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {url}"))?;

    if !response.status().is_success() {
        bail!("Failed to download {}: {}", url, response.status());
    }

    let bytes = response.bytes().await.context("Failed to read bytes")?;

    if let Some(parent) = Path::new(path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {path}"))?;

    Ok(())
}

async fn ensure_file(path: &str, url: Option<&str>) {
    if Path::new(path).exists() {
        return;
    }

    let Some(url) = url else {
        tracing::warn!("{} not found and no download URL configured", path);
        return;
    };

    if let Err(err) = download_file(url, path).await {
        tracing::error!("Could not fetch {}: {:#}", path, err);
    }
}

/// Downloads the model graph and class list when they are missing locally.
/// Failures are logged; startup carries on with whatever is on disk.
pub async fn ensure_files_exist(config: &Config) {
    tracing::info!("Checking model artifacts...");
    ensure_file(&config.model_path, config.model_url.as_deref()).await;
    ensure_file(&config.class_list_path, config.class_list_url.as_deref()).await;
}
