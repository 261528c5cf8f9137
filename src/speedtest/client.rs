//! In-process speed test client.
//!
//! Talks to servers exposing `__down` / `__up` endpoints. The usage mirrors a
//! classic speed test library: build a client, pick the best server, measure
//! download, measure upload, then read the ping recorded during selection.

use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use tracing::{debug, info};

use crate::settings::Settings;

use super::{download::DownloadTest, ping::PingTest, upload::UploadTest};

#[derive(Debug, Clone, PartialEq)]
pub struct BestServer {
    pub url: String,
    pub latency_ms: f64,
}

pub struct SpeedTestClient {
    http: reqwest::Client,
    servers: Vec<String>,
    ping_count: usize,
    download_size: u64,
    upload_size: usize,
    best: Option<BestServer>,
}

impl SpeedTestClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            servers: settings.servers.clone(),
            ping_count: settings.ping_count.max(1),
            download_size: settings.download_size_bytes(),
            upload_size: settings.upload_size_bytes(),
            best: None,
        })
    }

    /// Pings every configured server and keeps the one with the lowest mean
    /// latency. Unreachable servers are skipped.
    pub async fn get_best_server(&mut self) -> Result<&BestServer> {
        let mut best: Option<BestServer> = None;

        for server in &self.servers {
            let mut test = PingTest::new(self.ping_count);
            match test.run(&self.http, server).await {
                Ok(latency_ms) => {
                    debug!(%server, latency_ms, "server latency");
                    if best.as_ref().map_or(true, |b| latency_ms < b.latency_ms) {
                        best = Some(BestServer {
                            url: server.clone(),
                            latency_ms,
                        });
                    }
                }
                Err(e) => debug!(%server, error = %e, "server unreachable"),
            }
        }

        let best = best.ok_or_else(|| anyhow!("no speed test server reachable"))?;
        info!(server = %best.url, latency_ms = best.latency_ms, "selected server");
        Ok(self.best.insert(best))
    }

    pub async fn download<P>(&self, progress: &P) -> Result<f64>
    where
        P: Fn(&str) + Sync,
    {
        let server = self.server()?;
        DownloadTest::new(self.download_size)
            .run(&self.http, &server.url, progress)
            .await
            .with_context(|| format!("download from {}", server.url))
    }

    pub async fn upload<P>(&self, progress: &P) -> Result<f64>
    where
        P: Fn(&str) + Sync,
    {
        let server = self.server()?;
        UploadTest::new(self.upload_size)
            .run(&self.http, &server.url, progress)
            .await
            .with_context(|| format!("upload to {}", server.url))
    }

    /// Latency recorded by the last server selection.
    pub fn ping_ms(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.latency_ms)
    }

    fn server(&self) -> Result<&BestServer> {
        self.best
            .as_ref()
            .ok_or_else(|| anyhow!("no server selected; call get_best_server first"))
    }
}
