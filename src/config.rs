//! Run configuration and the saved assembly/sample selection.
//!
//! [`RunConfig`] is built once from the CLI surface and threaded through
//! every pipeline entry point; nothing in the crate reads ambient state.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data_structs::SampleId;

/// Public NGSmethDB API endpoint.
pub const DEFAULT_SERVER: &str = "http://bioinfo2.ugr.es:8888/NGSmethAPI";
/// Connection attempts per request before the run aborts.
pub const DEFAULT_RETRIES: u32 = 10;
/// Per-request timeout; a hung connection counts as a failed attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Percentile threshold of the segments endpoint.
pub const DEFAULT_PERCENTILE: &str = "95";

/// Immutable per-run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub server:     String,
    pub retries:    u32,
    pub timeout:    Duration,
    pub percentile: String,
    pub output:     PathBuf,
}

impl RunConfig {
    pub fn new(server: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            server:     server.into(),
            retries:    DEFAULT_RETRIES,
            timeout:    DEFAULT_TIMEOUT,
            percentile: DEFAULT_PERCENTILE.to_string(),
            output:     output.into(),
        }
    }

    pub fn with_percentile(mut self, percentile: impl Into<String>) -> Self {
        self.percentile = percentile.into();
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An assembly and the ordered samples to query, as saved in a JSON
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub assembly: String,
    pub samples:  Vec<SampleId>,
}

impl Selection {
    /// Reads a selection from a JSON configuration file. A malformed file
    /// aborts the run.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("cannot open configuration file {}", path.display()))?;
        serde_json::from_reader(file)
            .with_context(|| format!("invalid configuration file {}", path.display()))
    }

    /// Writes the selection as a JSON configuration file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("cannot create configuration file {}", path.display()))?;
        serde_json::to_writer(file, self)
            .with_context(|| format!("cannot write configuration file {}", path.display()))
    }
}
