// # HTTP Endpoint Discovery
//
// Resolves the named endpoints the reconciler publishes:
//
// - `local`: loopback, always present
// - `public`: the external address as seen by an HTTP lookup service
// - `private`: the LAN address of the default route interface
//
// ## Degradation
//
// A lookup service being down means that endpoint is omitted from the
// table for the cycle, not that discovery fails; records targeting the
// missing endpoint are retried once it reappears.

use std::net::IpAddr;
use std::time::Duration;

use nsherd_core::error::{Error, Result};
use nsherd_core::traits::discovery::EndpointDiscovery;
use nsherd_core::EndpointTable;
use tracing::{debug, warn};

/// Default lookup service for the public IPv4 address
const DEFAULT_IPV4_URL: &str = "https://api.ipify.org";

/// Default lookup service for the public IPv6 address
const DEFAULT_IPV6_URL: &str = "https://api6.ipify.org";

/// Request timeout against the lookup services
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Address the private-endpoint probe "connects" to; UDP connect sends no
/// packets, it only selects the default-route local address
const PROBE_TARGET: &str = "8.8.8.8:80";

/// HTTP-based endpoint discovery
pub struct HttpEndpointDiscovery {
    client: reqwest::Client,
    ipv4_url: String,
    ipv6_url: String,
    probe_private: bool,
}

impl HttpEndpointDiscovery {
    /// Create a discovery backend using the default ipify services
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_IPV4_URL, DEFAULT_IPV6_URL)
    }

    /// Create a discovery backend against specific lookup URLs
    ///
    /// The services must answer `GET` with the caller's address as plain
    /// text.
    pub fn with_urls(ipv4_url: impl Into<String>, ipv6_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            ipv4_url: ipv4_url.into(),
            ipv6_url: ipv6_url.into(),
            probe_private: true,
        }
    }

    /// Enable or disable the private-address probe
    pub fn with_private_probe(mut self, enabled: bool) -> Self {
        self.probe_private = enabled;
        self
    }

    /// Fetch one address from a plain-text lookup service
    async fn fetch_ip(&self, url: &str) -> Result<IpAddr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::discovery(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::discovery(format!(
                "lookup service {url} answered {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::discovery(format!("cannot read response from {url}: {e}")))?;

        text.trim()
            .parse::<IpAddr>()
            .map_err(|_| Error::discovery(format!("{url} returned a non-address: {text:?}")))
    }

    /// Local address of the default-route interface
    async fn probe_private_addr(&self) -> Result<IpAddr> {
        let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(PROBE_TARGET).await?;
        Ok(socket.local_addr()?.ip())
    }
}

impl Default for HttpEndpointDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EndpointDiscovery for HttpEndpointDiscovery {
    async fn discover(&self) -> Result<EndpointTable> {
        let mut table = EndpointTable::with_local();

        let public_v4 = match self.fetch_ip(&self.ipv4_url).await {
            Ok(addr @ IpAddr::V4(_)) => {
                table.insert("public", addr);
                Some(addr)
            }
            Ok(addr) => {
                warn!(%addr, "IPv4 lookup service returned an IPv6 address, ignoring");
                None
            }
            Err(e) => {
                warn!(error = %e, "public IPv4 lookup failed");
                None
            }
        };

        match self.fetch_ip(&self.ipv6_url).await {
            // Some lookup services answer the v6 URL over v4; only a
            // distinct IPv6 address is worth publishing.
            Ok(addr @ IpAddr::V6(_)) if Some(addr) != public_v4 => {
                table.insert("public", addr);
            }
            Ok(addr) => debug!(%addr, "no distinct public IPv6 address"),
            Err(e) => debug!(error = %e, "public IPv6 lookup failed"),
        }

        if self.probe_private {
            match self.probe_private_addr().await {
                Ok(addr) if !addr.is_loopback() && !addr.is_unspecified() => {
                    table.insert("private", addr);
                }
                Ok(addr) => debug!(%addr, "private probe returned no usable address"),
                Err(e) => warn!(error = %e, "private address probe failed"),
            }
        }

        Ok(table)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
