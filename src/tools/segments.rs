//! Segment formatter: per-region, per-sample rows of the methylation
//! segments endpoint.

use anyhow::Result;
use log::{info, warn};

use crate::config::{RunConfig, Selection};
use crate::data_structs::{Region, SampleId, SegmentRecord};
use crate::io::http::ApiClient;
use crate::io::output::{OutputLayout, TsvWriter};

const SEGMENT_HEADER: [&str; 7] = [
    "#chrom",
    "start",
    "end",
    "sampleCount",
    "sample",
    "sample.methRatio",
    "sample.cgCount",
];

/// One row per requested sample present in a segment's sample set.
pub fn segment_rows(records: &[SegmentRecord], samples: &[SampleId]) -> Vec<[String; 7]> {
    let mut rows = Vec::new();
    for record in records {
        for sample in samples {
            let Some(entry) = record
                .samples
                .individuals
                .get(sample.individual())
                .and_then(|by_sample| by_sample.get(sample.sample()))
            else {
                continue;
            };
            rows.push([
                record.chrom.clone(),
                record.start.to_string(),
                record.end.to_string(),
                record.samples.sample_count.to_string(),
                sample.to_string(),
                entry.meth_ratio.to_string(),
                entry.cg_count.to_string(),
            ]);
        }
    }
    rows
}

/// Fetches and writes `segments/<region>.tsv`. An empty response skips the
/// region with a warning; zero matching rows leave no file behind.
pub fn write_region_segments(
    client: &ApiClient,
    config: &RunConfig,
    layout: &OutputLayout,
    region: &Region,
    selection: &Selection,
) -> Result<()> {
    let Some(records) =
        client.region_segments(&config.percentile, &selection.assembly, region)?
    else {
        warn!("no segment data available in this region");
        return Ok(());
    };

    info!("calculating");
    let rows = segment_rows(&records, &selection.samples);
    if rows.is_empty() {
        return Ok(());
    }

    let dir = layout.segments_dir()?;
    let mut writer = TsvWriter::create(
        &dir.join(format!("{}.tsv", region.dir_name())),
        SEGMENT_HEADER,
    )?;
    for row in rows {
        writer.write_row(row)?;
    }
    writer.flush()?;
    info!("done");
    Ok(())
}
