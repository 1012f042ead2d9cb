//! JSON snapshot of the dining data, read from disk or fetched over HTTP.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::adapters::memory::MenuRecord;
use crate::domain::model::{DiningHall, Dish, MenuDate, Rating};
use crate::utils::error::{RecError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub halls: Vec<DiningHall>,
    #[serde(default)]
    pub dishes: Vec<Dish>,
    #[serde(default)]
    pub menus: Vec<MenuRecord>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_loaded: Option<MenuDate>,
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

pub async fn load_snapshot(source: &str) -> Result<Snapshot> {
    if is_remote(source) {
        fetch_snapshot(&Client::new(), source).await
    } else {
        read_snapshot_file(source).await
    }
}

pub async fn read_snapshot_file<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let path = path.as_ref();
    tracing::debug!("Reading snapshot from {}", path.display());

    let content = tokio::fs::read_to_string(path).await?;
    let snapshot: Snapshot = serde_json::from_str(&content)?;

    tracing::debug!(
        "Snapshot: {} halls, {} dishes, {} menus, {} ratings",
        snapshot.halls.len(),
        snapshot.dishes.len(),
        snapshot.menus.len(),
        snapshot.ratings.len()
    );
    Ok(snapshot)
}

pub async fn fetch_snapshot(client: &Client, url: &str) -> Result<Snapshot> {
    tracing::debug!("Fetching snapshot from {}", url);
    let response = client.get(url).send().await?;

    let status = response.status();
    tracing::debug!("Snapshot response status: {}", status);
    if !status.is_success() {
        return Err(RecError::upstream(url, format!("HTTP {}", status)));
    }

    Ok(response.json::<Snapshot>().await?)
}

pub async fn write_snapshot_file<P: AsRef<Path>>(path: P, snapshot: &Snapshot) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
