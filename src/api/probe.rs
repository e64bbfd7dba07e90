use std::time::Duration;

use tokio::net::TcpStream;
use url::Url;

use super::traits::Connectivity;

/// Reachability check that opens (and drops) a TCP connection to the portal.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe the host and port the portal address points at.
    /// Returns `None` for addresses without a host (e.g. `file:` URLs)
    pub fn for_url(url: &Url, timeout: Duration) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(host, port, timeout))
    }
}

impl Connectivity for TcpProbe {
    async fn is_reachable(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(host = %self.host, port = self.port, "Connection failed: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!(host = %self.host, port = self.port, "Connection timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_for_url_uses_default_port() {
        let url = Url::parse("https://www.arcgis.com/home").unwrap();
        let probe = TcpProbe::for_url(&url, Duration::from_secs(1)).unwrap();
        assert_eq!(probe.host, "www.arcgis.com");
        assert_eq!(probe.port, 443);

        let url = Url::parse("http://localhost:8080").unwrap();
        let probe = TcpProbe::for_url(&url, Duration::from_secs(1)).unwrap();
        assert_eq!(probe.port, 8080);
    }

    #[tokio::test]
    async fn test_reachable_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(!probe.is_reachable().await);
    }
}
