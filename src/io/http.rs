//! HTTP fetcher for the NGSmethDB API.
//!
//! One [`ApiClient`] serves the whole run. Transport-level failures are
//! retried up to the configured maximum with a warning per attempt; an HTTP
//! error status is terminal immediately. Either error aborts the whole run,
//! there is no per-region recovery.

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::config::RunConfig;
use crate::data_structs::{Assembly, PositionRecord, Region, SampleId, SampleTree, SegmentRecord};

/// Version key the server publishes for this client under `GET /version`.
const VERSION_KEY: &str = "NGSmethDB_API_client";

/// Classified fetch failures. All of them are fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unable to connect to {url} after {attempts} attempts")]
    Connect { url: String, attempts: u32 },
    #[error("API error: {0}")]
    Status(u16),
    #[error("malformed response from {url}")]
    Malformed {
        url:    String,
        #[source]
        source: std::io::Error,
    },
}

/// Blocking JSON client with bounded retry on connection failure.
pub struct ApiClient {
    agent:   ureq::Agent,
    server:  String,
    retries: u32,
}

impl ApiClient {
    pub fn new(config: &RunConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            agent,
            server: config.server.trim_end_matches('/').to_string(),
            retries: config.retries.max(1),
        }
    }

    /// Issues one GET and decodes the JSON body.
    pub fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut attempts = 0;
        let response = loop {
            match self.agent.get(url).call() {
                Ok(response) => break response,
                Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status(code)),
                Err(ureq::Error::Transport(_)) => {
                    attempts += 1;
                    if attempts < self.retries {
                        warn!("connection failed, retrying ({attempts}/{})", self.retries);
                    }
                    else {
                        return Err(FetchError::Connect {
                            url: url.to_string(),
                            attempts,
                        });
                    }
                },
            }
        };
        response.into_json().map_err(|source| {
            FetchError::Malformed {
                url: url.to_string(),
                source,
            }
        })
    }

    /// `GET {server}/info`: the assemblies the server hosts.
    pub fn assemblies(&self) -> Result<Vec<Assembly>> {
        let url = format!("{}/info", self.server);
        let value = self.get_json(&url)?;
        serde_json::from_value(value).context("malformed assembly list")
    }

    /// `GET {server}/{assembly}/info`: individuals and their samples.
    pub fn sample_tree(&self, assembly: &str) -> Result<SampleTree> {
        let url = format!("{}/{}/info", self.server, assembly);
        let value = self.get_json(&url)?;
        serde_json::from_value(value)
            .with_context(|| format!("malformed sample listing for assembly {assembly}"))
    }

    /// Fetches the per-position methylation and differential-methylation
    /// records of one region. `None` marks a region the database has no
    /// data for, which is not an error.
    pub fn region_sites(
        &self,
        assembly: &str,
        region: &Region,
        samples: &[SampleId],
    ) -> Result<Option<Vec<PositionRecord>>> {
        let url = format!(
            "{}/{}/{}?samples={}",
            self.server,
            assembly,
            region.query(),
            samples.iter().join(",")
        );
        info!("methylation levels and DMCs, GET: {url}");
        let value = self.get_json(&url)?;
        if is_empty(&value) {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("malformed position records for region {region}"))
    }

    /// Fetches the methylation segments of one region at the given
    /// percentile threshold. `None` marks an empty result.
    pub fn region_segments(
        &self,
        percentile: &str,
        assembly: &str,
        region: &Region,
    ) -> Result<Option<Vec<SegmentRecord>>> {
        let url = format!(
            "{}/segments/{}/{}/{}",
            self.server,
            percentile,
            assembly,
            region.query()
        );
        info!("methylation segments, GET: {url}");
        let value = self.get_json(&url)?;
        if is_empty(&value) {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("malformed segment records for region {region}"))
    }

    /// `GET {server}/version`: the client version the server publishes,
    /// used for the startup update notice.
    pub fn remote_client_version(&self) -> Result<Option<Vec<u32>>> {
        let url = format!("{}/version", self.server);
        let value = self.get_json(&url)?;
        let version = value
            .get(0)
            .and_then(|entry| entry.get(VERSION_KEY))
            .and_then(|triple| serde_json::from_value(triple.clone()).ok());
        Ok(version)
    }
}

/// Empty JSON bodies (null, `[]`, `{}`) mark regions without data.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::config::RunConfig;

    fn client(server: String, retries: u32) -> ApiClient {
        let config = RunConfig::new(server, "unused")
            .with_retries(retries)
            .with_timeout(Duration::from_secs(2));
        ApiClient::new(&config)
    }

    /// Serves one canned HTTP response on a loopback socket.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn decodes_json_on_success() {
        let server = serve_once("200 OK", "[{\"assembly\": \"hg38\"}]");
        let client = client(server.clone(), 1);
        let value = client.get_json(&format!("{server}/info")).unwrap();
        assert_eq!(value[0]["assembly"], "hg38");
    }

    #[test]
    fn error_status_is_terminal_without_retry() {
        let server = serve_once("500 Internal Server Error", "{}");
        let client = client(server.clone(), 5);
        match client.get_json(&format!("{server}/info")) {
            Err(FetchError::Status(500)) => {},
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn connection_failure_exhausts_the_retry_budget() {
        // Bind, learn the port, then close it again so connections fail.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let server = format!("http://127.0.0.1:{port}");
        let client = client(server.clone(), 3);
        match client.get_json(&format!("{server}/info")) {
            Err(FetchError::Connect { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected connect error, got {other:?}"),
        }
    }

    #[test]
    fn assemblies_decode_into_typed_entries() {
        let server = serve_once(
            "200 OK",
            "[{\"assembly\": \"hg38\", \"common\": \"Human\", \"species\": \"Homo sapiens\"}]",
        );
        let client = client(server, 1);
        let assemblies = client.assemblies().unwrap();
        assert_eq!(assemblies.len(), 1);
        assert_eq!(assemblies[0].assembly, "hg38");
        assert_eq!(assemblies[0].species, "Homo sapiens");
    }

    #[test]
    fn published_client_version_is_extracted() {
        let server = serve_once("200 OK", "[{\"NGSmethDB_API_client\": [0, 2, 0]}]");
        let client = client(server, 1);
        assert_eq!(client.remote_client_version().unwrap(), Some(vec![0, 2, 0]));
    }

    #[test]
    fn empty_bodies_are_detected() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&serde_json::json!([])));
        assert!(is_empty(&serde_json::json!({})));
        assert!(!is_empty(&serde_json::json!([1])));
        assert!(!is_empty(&serde_json::json!(0)));
    }
}
