use std::path::Path;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("scriptreel/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch `url` into `dest`, returning the number of bytes written
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Plain HTTP download streamed to disk.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("Download failed with status: {}", response.status()));
        }

        // Partial files never carry the final name
        let partial = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&partial)
            .await
            .with_context(|| format!("Failed to create {}", partial.display()))?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(err).context("Download interrupted");
                }
            };
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", partial.display()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.context("Failed to flush download")?;
        drop(file);

        if written == 0 {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(anyhow!("Downloaded file from {url} is empty"));
        }

        tokio::fs::rename(&partial, dest)
            .await
            .with_context(|| format!("Failed to move download to {}", dest.display()))?;
        Ok(written)
    }
}
