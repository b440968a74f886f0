//! Statistics reducer: per-sample descriptive statistics and the fixed-bin
//! ratio histogram of one region.

use std::collections::HashMap;

use anyhow::Result;
use statrs::statistics::Statistics;

use crate::data_structs::{Region, SampleId};
use crate::io::output::{OutputLayout, TsvWriter};
use crate::utils::{fmt_field, round1};

/// Number of fixed histogram bins covering ratios 0.0..=1.0 in 0.1 steps.
pub const BIN_COUNT: usize = 11;

/// Per-region collector of combined methylation ratios, rounded to the bin
/// resolution. Created fresh per region, consumed by the summary and
/// histogram writers, then discarded.
#[derive(Debug, Clone)]
pub struct RatioAccumulator {
    histogram: HashMap<SampleId, [u64; BIN_COUNT]>,
    ratios:    HashMap<SampleId, Vec<f64>>,
}

impl RatioAccumulator {
    pub fn new(samples: &[SampleId]) -> Self {
        Self {
            histogram: samples.iter().map(|s| (s.clone(), [0; BIN_COUNT])).collect(),
            ratios:    samples.iter().map(|s| (s.clone(), Vec::new())).collect(),
        }
    }

    /// Records one combined methylation ratio for a sample. The value is
    /// rounded to one decimal, binned, and appended to the sample's ratio
    /// list in arrival order.
    pub fn push(&mut self, sample: &SampleId, meth_ratio: f64) {
        let rounded = round1(meth_ratio);
        if let Some(bins) = self.histogram.get_mut(sample) {
            bins[bin_index(rounded)] += 1;
        }
        if let Some(list) = self.ratios.get_mut(sample) {
            list.push(rounded);
        }
    }

    /// The sample's ratios in arrival order.
    pub fn ratios(&self, sample: &SampleId) -> &[f64] {
        self.ratios.get(sample).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bin_count(&self, sample: &SampleId, bin: usize) -> u64 {
        self.histogram.get(sample).map(|bins| bins[bin]).unwrap_or(0)
    }
}

fn bin_index(rounded: f64) -> usize {
    ((rounded * 10.0).round() as usize).min(BIN_COUNT - 1)
}

/// Arithmetic mean; undefined for an empty list.
pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().mean())
}

/// Sample standard deviation (N-1 denominator); undefined below two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    (values.len() >= 2).then(|| values.iter().std_dev())
}

/// Median of a sorted copy, averaging the two middle values for even
/// lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
    else {
        sorted[mid]
    })
}

/// Linear-interpolation percentile, `k = (n-1) * percent`, over the values
/// exactly as given. The summary writer feeds values in arrival order and
/// does not sort first; callers wanting textbook percentiles must sort
/// before calling.
pub fn percentile(values: &[f64], percent: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let k = (values.len() - 1) as f64 * percent;
    let floor = k.floor();
    let ceil = k.ceil();
    if floor == ceil {
        return Some(values[k as usize]);
    }
    Some(values[floor as usize] * (ceil - k) + values[ceil as usize] * (k - floor))
}

/// Writes `summary_stat.tsv` and `histogram.tsv` for one region, one column
/// per sample, `.` where a statistic is undefined.
pub fn write_region_stats(
    layout: &OutputLayout,
    region: &Region,
    samples: &[SampleId],
    accumulator: &RatioAccumulator,
) -> Result<()> {
    let stats_dir = layout.stats_dir(region)?;

    let rows: [(&str, fn(&[f64]) -> Option<f64>); 7] = [
        ("average", mean),
        ("stdev", sample_stdev),
        ("p10", |values| percentile(values, 0.1)),
        ("p25", |values| percentile(values, 0.25)),
        ("p50", median),
        ("p75", |values| percentile(values, 0.75)),
        ("p90", |values| percentile(values, 0.9)),
    ];

    let mut summary =
        TsvWriter::create(&stats_dir.join("summary_stat.tsv"), header("#measure", samples))?;
    for (label, compute) in rows {
        let mut row = vec![label.to_string()];
        row.extend(
            samples
                .iter()
                .map(|sample| fmt_field(compute(accumulator.ratios(sample)))),
        );
        summary.write_row(row)?;
    }
    summary.flush()?;

    let mut histogram =
        TsvWriter::create(&stats_dir.join("histogram.tsv"), header("#methRatio", samples))?;
    for bin in 0..BIN_COUNT {
        let mut row = vec![format!("{:.1}", bin as f64 / 10.0)];
        row.extend(
            samples
                .iter()
                .map(|sample| accumulator.bin_count(sample, bin).to_string()),
        );
        histogram.write_row(row)?;
    }
    histogram.flush()
}

fn header(first: &str, samples: &[SampleId]) -> Vec<String> {
    let mut header = vec![first.to_string()];
    header.extend(samples.iter().map(ToString::to_string));
    header
}
