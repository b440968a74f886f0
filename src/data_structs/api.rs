//! Serde mappings of the NGSmethDB API payloads.
//!
//! The API nests almost everything by individual first and sample second;
//! [`SampleTable`] captures that shape once. Null values inside a table are
//! data (a strand without reads); missing keys for a requested sample are a
//! contract violation and surface as errors in the aggregation step.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// One assembly entry from `GET {server}/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct Assembly {
    pub assembly: String,
    pub common:   String,
    pub species:  String,
}

/// Individuals and their samples from `GET {server}/{assembly}/info`.
pub type SampleTree = BTreeMap<String, Vec<String>>;

/// A per-individual, per-sample table as the API ships it.
pub type SampleTable<T> = HashMap<String, HashMap<String, T>>;

/// The three per-strand count tables of one position record.
#[derive(Debug, Clone, Deserialize)]
pub struct StrandTable {
    #[serde(rename = "methylatedReads")]
    pub methylated_reads: SampleTable<Option<u32>>,
    pub coverage:         SampleTable<Option<u32>>,
    #[serde(rename = "phredScore")]
    pub phred_score:      SampleTable<Option<u32>>,
}

/// Watson/Crick split of the methylation counts.
#[derive(Debug, Clone, Deserialize)]
pub struct MethCounts {
    pub w: StrandTable,
    pub c: StrandTable,
}

/// p-values keyed by `ind1#ind2`, then `sample1#sample2`, then method name.
pub type DiffMeth = HashMap<String, HashMap<String, BTreeMap<String, Option<f64>>>>;

/// One per-position record of the methylation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    pub chrom:       String,
    pub pos:         u64,
    pub genotype:    SampleTable<Option<String>>,
    pub meth_cg:     MethCounts,
    #[serde(default)]
    pub diffmeth_cg: Option<DiffMeth>,
}

/// Aggregated values for one sample inside a segment record.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentSample {
    #[serde(rename = "methRatio")]
    pub meth_ratio: f64,
    #[serde(rename = "cgCount")]
    pub cg_count:   u64,
}

/// The sample set of one segment, with its count field alongside the
/// per-individual entries.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentSamples {
    #[serde(rename = "sampleCount")]
    pub sample_count: u64,
    #[serde(flatten)]
    pub individuals:  HashMap<String, HashMap<String, SegmentSample>>,
}

/// One record of the segments endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentRecord {
    pub chrom:   String,
    pub start:   u64,
    pub end:     u64,
    pub samples: SegmentSamples,
}
