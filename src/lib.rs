//! # methfetch
//!
//! `methfetch` is the library behind the NGSmethDB command-line client. It
//! covers the whole region-by-region retrieval pipeline: parsing a BED-style
//! region list, querying the NGSmethDB HTTP API for methylation ratios,
//! differential methylation and methylation segments, reducing the per-sample
//! ratios to descriptive statistics, and writing everything out as
//! tab-separated files.
//!
//! The crate is organized into several modules:
//!
//! * [`data_structs`]: core value types: genomic [`Region`]s, dotted
//!   [`SampleId`]s and the serde mappings of the API payloads.
//! * [`io`]: the retrying HTTP fetcher ([`ApiClient`]), the region list
//!   reader and the on-disk TSV layout.
//! * [`tools`]: the per-region aggregation, statistics and segment
//!   formatting steps, tied together by [`tools::process_region`].
//! * [`config`]: the immutable run configuration and the saved
//!   assembly/sample selection.
//!
//! Everything is synchronous and strictly sequential: one region is fetched,
//! reduced and written before the next one starts. Any classified failure
//! aborts the whole run; only legitimately empty API responses are skipped.

pub mod config;
pub mod data_structs;
pub mod io;
pub mod tools;
pub mod utils;

pub use config::{RunConfig, Selection};
pub use data_structs::{Region, SampleId};
pub use io::http::{ApiClient, FetchError};
