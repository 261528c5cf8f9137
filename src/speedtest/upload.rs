use anyhow::Result;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use super::TransferMeter;

const CHUNK_SIZE: usize = 1_000_000; // 1MB chunks

pub struct UploadTest {
    data: Vec<u8>,
}

impl UploadTest {
    pub fn new(upload_size: usize) -> Self {
        let mut rng = rand::rngs::StdRng::from_entropy();
        let data: Vec<u8> = (0..upload_size).map(|_| rng.gen()).collect();
        Self { data }
    }

    /// Average upload rate in bits per second.
    pub async fn run<P>(&self, client: &reqwest::Client, server: &str, progress: &P) -> Result<f64>
    where
        P: Fn(&str) + Sync,
    {
        let url = format!("{}/__up", server.trim_end_matches('/'));

        let start = Instant::now();
        let mut meter = TransferMeter::new("Upload", self.data.len() as u64);

        for chunk in self.data.chunks(CHUNK_SIZE) {
            client
                .post(&url)
                .timeout(Duration::from_secs(120))
                .body(chunk.to_vec())
                .send()
                .await?
                .error_for_status()?;

            if let Some(status) = meter.advance(chunk.len() as u64) {
                progress(&status);
            }
        }

        Ok(meter.transferred() as f64 * 8.0 / start.elapsed().as_secs_f64())
    }
}
