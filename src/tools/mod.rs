//! Per-region processing: aggregation, statistics and segments.

pub mod meth;
pub mod segments;
pub mod stats;

use anyhow::Result;
use log::{info, warn};

use crate::config::{RunConfig, Selection};
use crate::data_structs::Region;
use crate::io::http::ApiClient;
use crate::io::output::OutputLayout;

/// Runs the full fetch-compute-write cycle for one region, strictly
/// sequentially: methylation sites first, then the region's statistics,
/// then the methylation segments.
///
/// A region the database has no site data for is skipped entirely (with a
/// warning); every other failure propagates and aborts the run.
pub fn process_region(
    client: &ApiClient,
    config: &RunConfig,
    layout: &OutputLayout,
    region: &Region,
    selection: &Selection,
) -> Result<()> {
    info!("getting data from region {region}");

    let Some(records) = client.region_sites(&selection.assembly, region, &selection.samples)?
    else {
        warn!("no data available in this region");
        return Ok(());
    };

    info!("calculating");
    let accumulator = meth::write_region(layout, region, &selection.samples, &records)?;
    stats::write_region_stats(layout, region, &selection.samples, &accumulator)?;
    info!("done");

    segments::write_region_segments(client, config, layout, region, selection)
}
