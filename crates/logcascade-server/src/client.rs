//! Client for a running classification server

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

/// Upload a CSV file and return the classified table
pub async fn submit_file(server_url: &str, input: &Path) -> Result<Vec<u8>> {
    let contents = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let filename = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "logs.csv".to_string());

    let part = reqwest::multipart::Part::bytes(contents)
        .file_name(filename)
        .mime_str("text/csv")?;
    let form = reqwest::multipart::Form::new().part("file", part);

    let endpoint = format!("{}/classify/", server_url.trim_end_matches('/'));
    info!("Submitting {} to {}", input.display(), endpoint);

    let response = reqwest::Client::new()
        .post(&endpoint)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", endpoint))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Server returned {}: {}", status, body);
    }

    Ok(response.bytes().await?.to_vec())
}
