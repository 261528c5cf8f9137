use anyhow::{bail, Result};
use std::time::{Duration, Instant};

/// Round-trip latency against one server, averaged over `ping_count` requests.
pub struct PingTest {
    samples: Vec<f64>,
    ping_count: usize,
}

impl PingTest {
    pub fn new(ping_count: usize) -> Self {
        Self {
            samples: Vec::new(),
            ping_count,
        }
    }

    pub async fn run(&mut self, client: &reqwest::Client, server: &str) -> Result<f64> {
        let url = format!("{}/__down?bytes=0", server.trim_end_matches('/'));

        self.samples.clear();

        for _ in 0..self.ping_count {
            let start = Instant::now();
            let reply = client
                .get(&url)
                .timeout(Duration::from_secs(5))
                .send()
                .await
                .and_then(|r| r.error_for_status());
            if reply.is_ok() {
                self.samples.push(start.elapsed().as_secs_f64() * 1000.0);
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        match mean(&self.samples) {
            Some(avg) => Ok(avg),
            None => bail!("{server} did not answer any of {} pings", self.ping_count),
        }
    }
}

fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}
