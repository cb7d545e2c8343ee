// # nsherdd - nsherd Daemon
//
// The nsherdd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime and tracing
// 3. Wiring endpoint discovery, the desired-state source, provider
//    resolution, and the execution backend into the engine
// 4. Running the reconciliation loop until SIGINT/SIGTERM
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Engine
// - `NSHERD_TTL`: default record TTL in seconds (default: 10)
// - `NSHERD_UPDATE_INTERVAL`: poll interval in seconds (default: 10)
// - `NSHERD_CALL_TIMEOUT`: per provider-call timeout in seconds (default: 10)
//
// ### Desired-state source
// - `NSHERD_DOCKER_URL`: Docker Engine API endpoint (default: http://localhost:2375)
//
// ### Endpoint discovery
// - `NSHERD_IPV4_LOOKUP_URL`: public IPv4 lookup service (default: ipify)
// - `NSHERD_IPV6_LOOKUP_URL`: public IPv6 lookup service (default: ipify)
// - `NSHERD_PRIVATE_PROBE`: probe the LAN address (default: true)
//
// ### Records
// - `NSHERD_BOOTSTRAP_RECORDS`: permanent records seeded at startup,
//   `hostname=endpoint[+endpoint]` entries separated by commas, e.g.
//   `here.example.com=local,vpn.example.com=local+private`
//
// ### Logging
// - `NSHERD_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// The execution backend is the dry-run executor: operations are logged
// but no provider API is called. Deployments plug a real `DnsExecutor`
// in through the library API.

use std::env;
use std::process::ExitCode;

use anyhow::Result;
use nsherd_core::config::{ConfigResolver, default_map};
use nsherd_core::provider::{NsProviderResolver, SystemNameserverLookup};
use nsherd_core::record::BootstrapRecord;
use nsherd_core::traits::executor::DryRunExecutor;
use nsherd_core::{Engine, Reconciler, Settings};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum NsherdExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<NsherdExitCode> for ExitCode {
    fn from(code: NsherdExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    docker_url: String,
    ipv4_lookup_url: Option<String>,
    ipv6_lookup_url: Option<String>,
    private_probe: bool,
    bootstrap: Vec<BootstrapRecord>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            docker_url: env::var("NSHERD_DOCKER_URL")
                .unwrap_or_else(|_| nsherd_source_docker::DEFAULT_DOCKER_URL.to_string()),
            ipv4_lookup_url: env::var("NSHERD_IPV4_LOOKUP_URL").ok(),
            ipv6_lookup_url: env::var("NSHERD_IPV6_LOOKUP_URL").ok(),
            private_probe: env::var("NSHERD_PRIVATE_PROBE")
                .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            bootstrap: parse_bootstrap(&env::var("NSHERD_BOOTSTRAP_RECORDS").unwrap_or_default())?,
            log_level: env::var("NSHERD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.docker_url.starts_with("http://") && !self.docker_url.starts_with("https://") {
            anyhow::bail!(
                "NSHERD_DOCKER_URL must be an http(s) endpoint \
                (the unix socket transport is not supported). Got: {}",
                self.docker_url
            );
        }

        for url in [&self.ipv4_lookup_url, &self.ipv6_lookup_url]
            .into_iter()
            .flatten()
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("lookup service URL must use HTTP or HTTPS. Got: {}", url);
            }
        }

        for record in &self.bootstrap {
            validate_domain_name(&record.hostname)?;
            if record.endpoints.is_empty() {
                anyhow::bail!(
                    "bootstrap record {} names no endpoints. \
                    Use hostname=endpoint[+endpoint]",
                    record.hostname
                );
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NSHERD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// Parse `hostname=endpoint[+endpoint]` entries separated by commas
fn parse_bootstrap(raw: &str) -> Result<Vec<BootstrapRecord>> {
    let mut records = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((hostname, endpoints)) = entry.split_once('=') else {
            anyhow::bail!(
                "bootstrap entry {:?} is not of the form hostname=endpoint[+endpoint]",
                entry
            );
        };

        records.push(BootstrapRecord {
            hostname: hostname.trim().to_string(),
            endpoints: endpoints
                .split('+')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        });
    }

    Ok(records)
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 validation; not comprehensive but catches the common
/// mistakes. Wildcard records may lead with a `*` label.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("domain name cannot be empty");
    }

    if domain.len() > 253 {
        anyhow::bail!(
            "domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for (i, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            anyhow::bail!("domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if i == 0 && label == "*" {
            continue;
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return NsherdExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return NsherdExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NsherdExitCode::ConfigError.into();
    }

    info!("starting nsherdd");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return NsherdExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("daemon error: {}", e);
            NsherdExitCode::RuntimeError
        } else {
            NsherdExitCode::CleanShutdown
        }
    })
    .into()
}

/// Wire the components and run the engine
async fn run_daemon(config: Config) -> Result<()> {
    // Engine settings: env vars layered over built-in defaults
    let resolver = ConfigResolver::new()
        .with_env("NSHERD")
        .with_map(default_map());
    let settings = Settings::from_resolver(&resolver)?;
    info!(
        ttl = settings.default_ttl,
        update_interval = settings.update_interval,
        "engine settings resolved"
    );

    let discovery = match (&config.ipv4_lookup_url, &config.ipv6_lookup_url) {
        (None, None) => nsherd_endpoint_http::HttpEndpointDiscovery::new(),
        (v4, v6) => nsherd_endpoint_http::HttpEndpointDiscovery::with_urls(
            v4.as_deref().unwrap_or("https://api.ipify.org"),
            v6.as_deref().unwrap_or("https://api6.ipify.org"),
        ),
    }
    .with_private_probe(config.private_probe);

    let source = nsherd_source_docker::DockerRecordSource::new(&config.docker_url);

    let provider_resolver =
        NsProviderResolver::new(Box::new(SystemNameserverLookup::from_system_conf()?));

    // Real provider clients are deployment-specific; until one is wired
    // in, operations are logged by the dry-run backend.
    info!("using the dry-run execution backend");
    let reconciler = Reconciler::new(
        Box::new(DryRunExecutor),
        Box::new(provider_resolver),
        settings.clone(),
    );

    let (mut engine, _events) = Engine::new(
        Box::new(discovery),
        Box::new(source),
        reconciler,
        settings,
        config.bootstrap.clone(),
    );

    info!("starting reconciliation loop");
    engine.run().await?;

    info!("nsherdd stopped");
    Ok(())
}
