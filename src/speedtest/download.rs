use anyhow::Result;
use futures::StreamExt;
use std::time::{Duration, Instant};

use super::TransferMeter;

pub struct DownloadTest {
    download_size: u64,
}

impl DownloadTest {
    pub fn new(download_size: u64) -> Self {
        Self { download_size }
    }

    /// Average download rate in bits per second.
    pub async fn run<P>(&self, client: &reqwest::Client, server: &str, progress: &P) -> Result<f64>
    where
        P: Fn(&str) + Sync,
    {
        let url = format!("{}/__down?bytes={}", server.trim_end_matches('/'), self.download_size);
        let response = client
            .get(&url)
            .timeout(Duration::from_secs(120))
            .send()
            .await?
            .error_for_status()?;
        let total_size = response.content_length().unwrap_or(self.download_size);
        let mut stream = response.bytes_stream();

        let start = Instant::now();
        let mut meter = TransferMeter::new("Download", total_size);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(status) = meter.advance(chunk.len() as u64) {
                progress(&status);
            }
        }

        Ok(meter.transferred() as f64 * 8.0 / start.elapsed().as_secs_f64())
    }
}
