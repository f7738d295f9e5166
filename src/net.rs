//! Internet connectivity checks

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::Result;
use crate::config::NetworkConfig;

/// Answers "is this device online right now"
#[async_trait]
pub trait Connectivity: Send + Sync {
    /// Check live connectivity
    async fn is_connected(&self) -> bool;
}

/// Checks DNS servers with a TCP connect, then falls back to an HTTP fetch
pub struct NetworkChecker {
    config: NetworkConfig,
    client: reqwest::Client,
}

impl NetworkChecker {
    /// Create a checker from network settings
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    async fn dns_reachable(&self) -> bool {
        for host in &self.config.dns_hosts {
            let connect = TcpStream::connect(host.as_str());
            match tokio::time::timeout(self.config.timeout, connect).await {
                Ok(Ok(_)) => return true,
                Ok(Err(e)) => tracing::debug!(host = %host, error = %e, "dns check failed"),
                Err(_) => tracing::debug!(host = %host, "dns check timed out"),
            }
        }
        false
    }

    async fn http_reachable(&self) -> bool {
        match self.client.get(&self.config.http_url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                tracing::debug!(url = %self.config.http_url, error = %e, "http check failed");
                false
            }
        }
    }
}

#[async_trait]
impl Connectivity for NetworkChecker {
    async fn is_connected(&self) -> bool {
        self.dns_reachable().await || self.http_reachable().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn offline_config(http_url: String) -> NetworkConfig {
        NetworkConfig {
            // Reserved TEST-NET address, never routable
            dns_hosts: vec!["192.0.2.1:53".to_string()],
            http_url,
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn reachable_dns_host_counts_as_connected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let checker = NetworkChecker::new(NetworkConfig {
            dns_hosts: vec![addr.to_string()],
            http_url: "http://127.0.0.1:9/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        assert!(checker.is_connected().await);
    }

    #[tokio::test]
    async fn unreachable_everything_is_offline() {
        let config = offline_config("http://127.0.0.1:9/".to_string());
        let checker = NetworkChecker::new(config).unwrap();
        assert!(!checker.is_connected().await);
    }
}
