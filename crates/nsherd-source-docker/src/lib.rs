// # Docker Label Source
//
// Desired-state source that reads container labels from the Docker Engine
// API. A container opts in by carrying labels under the `nsherd.` prefix:
//
// ```text
// nsherd.proxy.hostname=proxy.example.com
// nsherd.proxy.endpoints=public,private
// nsherd.proxy.provider=cloudflare        (optional override)
// ```
//
// The middle segment (`proxy`) is the record key: an arbitrary namespace
// that lets one container describe several records, and several containers
// claim the same record. Provenance is `("docker", "container", <id>)`,
// deduplicated per record.
//
// The source is an observer only: it never decides what to create or
// delete, it just reports what the labels currently say.

use std::collections::HashMap;

use nsherd_core::error::{Error, Result};
use nsherd_core::record::{DesiredBatch, DesiredRecord, SourceRef};
use nsherd_core::traits::source::RecordSource;
use serde::Deserialize;
use tracing::{debug, warn};

/// Label prefix that opts a container into record publication
const LABEL_PREFIX: &str = "nsherd.";

/// Default Docker Engine API endpoint
///
/// The API must be reachable over TCP (`DOCKER_HOST=tcp://...`); the Unix
/// socket transport is not supported by this source.
pub const DEFAULT_DOCKER_URL: &str = "http://localhost:2375";

/// Container summary as returned by `GET /containers/json`
#[derive(Debug, Deserialize)]
struct ContainerSummary {
    #[serde(rename = "Id")]
    id: String,

    #[serde(rename = "Labels", default)]
    labels: HashMap<String, String>,
}

/// Docker-label desired-state source
pub struct DockerRecordSource {
    client: reqwest::Client,
    base_url: String,
}

impl DockerRecordSource {
    /// Create a source against a Docker Engine API base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let url = format!("{}/containers/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::source(format!("docker API request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::source(format!(
                "docker API answered {}",
                response.status()
            )));
        }

        response
            .json::<Vec<ContainerSummary>>()
            .await
            .map_err(|e| Error::source(format!("cannot decode docker container list: {e}")))
    }
}

#[async_trait::async_trait]
impl RecordSource for DockerRecordSource {
    async fn pull(&self) -> Result<DesiredBatch> {
        let containers = self.list_containers().await?;

        let mut batch = DesiredBatch::new();
        for container in &containers {
            merge_container_labels(&mut batch, &container.id, &container.labels);
        }

        debug!(
            containers = containers.len(),
            records = batch.len(),
            "pulled desired records from docker"
        );
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

/// Parse one container's labels into the shared desired batch
///
/// Unknown label fields are ignored; a record key whose `hostname` label
/// is missing is dropped with a warning. When several containers claim the
/// same record key, the first hostname wins and later observers are merged
/// in as additional sources.
fn merge_container_labels(
    batch: &mut DesiredBatch,
    container_id: &str,
    labels: &HashMap<String, String>,
) {
    // key -> partially assembled record
    let mut hostnames: HashMap<String, String> = HashMap::new();
    let mut endpoints: HashMap<String, Vec<String>> = HashMap::new();
    let mut providers: HashMap<String, String> = HashMap::new();

    for (label, value) in labels {
        let Some(rest) = label.strip_prefix(LABEL_PREFIX) else {
            continue;
        };
        let Some((key, field)) = rest.split_once('.') else {
            warn!(label = %label, container_id, "malformed record label, ignoring");
            continue;
        };

        match field {
            "hostname" => {
                hostnames.insert(key.to_string(), value.clone());
            }
            "endpoints" => {
                endpoints.insert(
                    key.to_string(),
                    value
                        .split(',')
                        .map(|e| e.trim().to_string())
                        .filter(|e| !e.is_empty())
                        .collect(),
                );
            }
            "provider" => {
                providers.insert(key.to_string(), value.clone());
            }
            _ => {
                debug!(label = %label, container_id, "unknown record label field");
            }
        }
    }

    let source = SourceRef::new("docker", "container", container_id);

    let mut keys: Vec<String> = hostnames.keys().cloned().collect();
    keys.extend(endpoints.keys().cloned());
    keys.sort();
    keys.dedup();

    for key in keys {
        let Some(hostname) = hostnames.get(&key) else {
            warn!(
                key = %key,
                container_id,
                "record labels without a hostname, skipping"
            );
            continue;
        };

        match batch.get_mut(&key) {
            Some(existing) => {
                if &existing.hostname != hostname {
                    warn!(
                        key = %key,
                        kept = %existing.hostname,
                        ignored = %hostname,
                        "conflicting hostnames for record key, keeping first"
                    );
                }
                if !existing.sources.iter().any(|s| s.same_observation(&source)) {
                    existing.sources.push(source.clone());
                }
            }
            None => {
                batch.insert(
                    key.clone(),
                    DesiredRecord {
                        hostname: hostname.clone(),
                        endpoints: endpoints.get(&key).cloned().unwrap_or_default(),
                        sources: vec![source.clone()],
                        provider: providers.get(&key).cloned(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_hostname_and_endpoints() {
        let mut batch = DesiredBatch::new();
        merge_container_labels(
            &mut batch,
            "c1",
            &labels(&[
                ("nsherd.proxy.hostname", "proxy.example.com"),
                ("nsherd.proxy.endpoints", "public, private"),
                ("com.docker.compose.project", "demo"),
            ]),
        );

        let record = batch.get("proxy").expect("record parsed");
        assert_eq!(record.hostname, "proxy.example.com");
        assert_eq!(record.endpoints, vec!["public", "private"]);
        assert_eq!(record.sources, vec![SourceRef::new("docker", "container", "c1")]);
        assert_eq!(record.provider, None);
    }

    #[test]
    fn provider_label_becomes_an_override() {
        let mut batch = DesiredBatch::new();
        merge_container_labels(
            &mut batch,
            "c1",
            &labels(&[
                ("nsherd.web.hostname", "www.example.com"),
                ("nsherd.web.endpoints", "public"),
                ("nsherd.web.provider", "gandi"),
            ]),
        );

        assert_eq!(batch.get("web").unwrap().provider.as_deref(), Some("gandi"));
    }

    #[test]
    fn one_container_can_describe_several_records() {
        let mut batch = DesiredBatch::new();
        merge_container_labels(
            &mut batch,
            "c1",
            &labels(&[
                ("nsherd.web.hostname", "www.example.com"),
                ("nsherd.web.endpoints", "public"),
                ("nsherd.intra.hostname", "intra.example.com"),
                ("nsherd.intra.endpoints", "private"),
            ]),
        );

        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn missing_hostname_drops_the_record() {
        let mut batch = DesiredBatch::new();
        merge_container_labels(
            &mut batch,
            "c1",
            &labels(&[("nsherd.web.endpoints", "public")]),
        );

        assert!(batch.is_empty());
    }

    #[test]
    fn second_container_merges_as_additional_source() {
        let mut batch = DesiredBatch::new();
        let shared = &[
            ("nsherd.web.hostname", "www.example.com"),
            ("nsherd.web.endpoints", "public"),
        ];
        merge_container_labels(&mut batch, "c1", &labels(shared));
        merge_container_labels(&mut batch, "c2", &labels(shared));

        let record = batch.get("web").unwrap();
        assert_eq!(record.sources.len(), 2);
    }

    #[test]
    fn same_container_observed_twice_is_one_source() {
        let mut batch = DesiredBatch::new();
        let shared = &[
            ("nsherd.web.hostname", "www.example.com"),
            ("nsherd.web.endpoints", "public"),
        ];
        merge_container_labels(&mut batch, "c1", &labels(shared));
        merge_container_labels(&mut batch, "c1", &labels(shared));

        assert_eq!(batch.get("web").unwrap().sources.len(), 1);
    }

    #[test]
    fn conflicting_hostname_keeps_the_first() {
        let mut batch = DesiredBatch::new();
        merge_container_labels(
            &mut batch,
            "c1",
            &labels(&[
                ("nsherd.web.hostname", "www.example.com"),
                ("nsherd.web.endpoints", "public"),
            ]),
        );
        merge_container_labels(
            &mut batch,
            "c2",
            &labels(&[
                ("nsherd.web.hostname", "other.example.com"),
                ("nsherd.web.endpoints", "public"),
            ]),
        );

        assert_eq!(batch.get("web").unwrap().hostname, "www.example.com");
    }
}
