//! Methylation aggregator.
//!
//! Reshapes the per-position records of one region into per-sample TSV
//! rows, feeds the combined ratios into the [`RatioAccumulator`], and
//! splits differential-methylation pairs into intraindividual and
//! interindividual output streams.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::data_structs::{PositionRecord, Region, SampleId, SampleTable, StrandTable};
use crate::io::output::{OutputLayout, TsvWriter};
use crate::tools::stats::RatioAccumulator;
use crate::utils::{fmt_field, round2};

const SITE_HEADER: [&str; 15] = [
    "#chrom",
    "pos",
    "genotype",
    "w_methylatedReads",
    "w_coverage",
    "w_phredScore",
    "c_methylatedReads",
    "c_coverage",
    "c_phredScore",
    "methylatedReads",
    "coverage",
    "phredScore",
    "w_methRatio",
    "c_methRatio",
    "methRatio",
];

const DIFF_HEADER: [&str; 6] = ["chrom", "pos", "sample1", "sample2", "method", "pvalue"];

/// Counts and ratio of a single strand for one sample at one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrandSite {
    pub methylated_reads: Option<u32>,
    pub coverage:         Option<u32>,
    pub phred_score:      Option<u32>,
    pub meth_ratio:       Option<f64>,
}

impl StrandSite {
    fn from_tables(tables: &StrandTable, sample: &SampleId) -> Result<Self> {
        let methylated_reads = lookup(&tables.methylated_reads, sample, "methylatedReads")?;
        let coverage = lookup(&tables.coverage, sample, "coverage")?;
        let phred_score = lookup(&tables.phred_score, sample, "phredScore")?;
        // A strand ratio exists only with reads and coverage both present
        // and non-zero.
        let meth_ratio = match (methylated_reads, coverage) {
            (Some(reads), Some(cov)) if reads > 0 && cov > 0 => {
                Some(round2(reads as f64 / cov as f64))
            },
            _ => None,
        };
        Ok(Self {
            methylated_reads,
            coverage,
            phred_score,
            meth_ratio,
        })
    }
}

/// Per-sample values derived from one position record: both strands plus
/// the combined counts and ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCounts {
    pub genotype:         Option<String>,
    pub w:                StrandSite,
    pub c:                StrandSite,
    pub methylated_reads: u32,
    pub coverage:         u32,
    pub phred_score:      Option<u32>,
    pub meth_ratio:       Option<f64>,
}

impl SiteCounts {
    /// Derives one sample's site from a position record. A requested sample
    /// missing from any table is a contract violation and aborts the run.
    pub fn from_record(record: &PositionRecord, sample: &SampleId) -> Result<Self> {
        let genotype = lookup(&record.genotype, sample, "genotype")?;
        let w = StrandSite::from_tables(&record.meth_cg.w, sample)?;
        let c = StrandSite::from_tables(&record.meth_cg.c, sample)?;

        let methylated_reads =
            w.methylated_reads.unwrap_or(0) + c.methylated_reads.unwrap_or(0);
        let coverage = w.coverage.unwrap_or(0) + c.coverage.unwrap_or(0);
        let phred_score = combine_phred(w.phred_score, c.phred_score);
        // Both strands can be null at a reported position; such a site has
        // zero combined coverage and carries no ratio.
        let meth_ratio =
            (coverage > 0).then(|| round2(methylated_reads as f64 / coverage as f64));

        Ok(Self {
            genotype,
            w,
            c,
            methylated_reads,
            coverage,
            phred_score,
            meth_ratio,
        })
    }

    fn row(&self, record: &PositionRecord) -> Vec<String> {
        vec![
            record.chrom.clone(),
            record.pos.to_string(),
            fmt_field(self.genotype.as_deref()),
            fmt_field(self.w.methylated_reads),
            fmt_field(self.w.coverage),
            fmt_field(self.w.phred_score),
            fmt_field(self.c.methylated_reads),
            fmt_field(self.c.coverage),
            fmt_field(self.c.phred_score),
            self.methylated_reads.to_string(),
            self.coverage.to_string(),
            fmt_field(self.phred_score),
            fmt_field(self.w.meth_ratio),
            fmt_field(self.c.meth_ratio),
            fmt_field(self.meth_ratio),
        ]
    }
}

/// A zero score marks an absent strand, the service's convention.
fn combine_phred(w: Option<u32>, c: Option<u32>) -> Option<u32> {
    match (w.filter(|&v| v > 0), c.filter(|&v| v > 0)) {
        (Some(w), Some(c)) => Some((w + c) / 2),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

fn lookup<T: Clone>(table: &SampleTable<T>, sample: &SampleId, field: &str) -> Result<T> {
    table
        .get(sample.individual())
        .and_then(|by_sample| by_sample.get(sample.sample()))
        .cloned()
        .with_context(|| format!("sample {sample} missing from `{field}` in the API response"))
}

/// The two speculative differential-methylation writers of one region.
/// Both files are created with headers up front; the ones that received no
/// data rows are removed when the region completes.
struct DiffWriters {
    intra:      TsvWriter,
    inter:      TsvWriter,
    intra_path: PathBuf,
    inter_path: PathBuf,
    has_intra:  bool,
    has_inter:  bool,
}

impl DiffWriters {
    fn open(layout: &OutputLayout, region: &Region) -> Result<Self> {
        let dir = layout.diffmeth_dir(region)?;
        let intra_path = dir.join("intraindividual.tsv");
        let inter_path = dir.join("interindividual.tsv");
        Ok(Self {
            intra: TsvWriter::create(&intra_path, DIFF_HEADER)?,
            inter: TsvWriter::create(&inter_path, DIFF_HEADER)?,
            intra_path,
            inter_path,
            has_intra: false,
            has_inter: false,
        })
    }

    fn writer_for(&mut self, first: &SampleId, second: &SampleId) -> &mut TsvWriter {
        if first.same_individual(second) {
            self.has_intra = true;
            &mut self.intra
        }
        else {
            self.has_inter = true;
            &mut self.inter
        }
    }

    fn finish(mut self) -> Result<()> {
        self.intra.flush()?;
        self.inter.flush()?;
        drop(self.intra);
        drop(self.inter);
        if !self.has_intra {
            fs::remove_file(&self.intra_path)
                .with_context(|| format!("cannot remove {}", self.intra_path.display()))?;
        }
        if !self.has_inter {
            fs::remove_file(&self.inter_path)
                .with_context(|| format!("cannot remove {}", self.inter_path.display()))?;
        }
        Ok(())
    }
}

/// Writes the per-sample site files and differential files of one region
/// and returns the filled accumulator for the statistics step.
pub fn write_region(
    layout: &OutputLayout,
    region: &Region,
    samples: &[SampleId],
    records: &[PositionRecord],
) -> Result<RatioAccumulator> {
    let meth_dir = layout.meth_dir(region)?;
    let mut site_writers = samples
        .iter()
        .map(|sample| TsvWriter::create(&meth_dir.join(format!("{sample}.tsv")), SITE_HEADER))
        .collect::<Result<Vec<_>>>()?;

    let mut accumulator = RatioAccumulator::new(samples);

    // The differential files exist only for regions that carry any
    // differential data at all.
    let wants_diff =
        samples.len() >= 2 && records.iter().any(|record| record.diffmeth_cg.is_some());
    let mut diff = if wants_diff {
        Some(DiffWriters::open(layout, region)?)
    }
    else {
        None
    };

    for record in records {
        for (sample, writer) in samples.iter().zip(site_writers.iter_mut()) {
            let site = SiteCounts::from_record(record, sample)?;
            if let Some(meth_ratio) = site.meth_ratio {
                accumulator.push(sample, meth_ratio);
            }
            writer.write_row(site.row(record))?;
        }

        if let (Some(streams), Some(diffmeth)) = (diff.as_mut(), &record.diffmeth_cg) {
            for (first, second) in samples.iter().tuple_combinations() {
                let individual_pair =
                    format!("{}#{}", first.individual(), second.individual());
                let Some(by_samples) = diffmeth.get(&individual_pair) else {
                    continue;
                };
                let sample_pair = format!("{}#{}", first.sample(), second.sample());
                let Some(pvalues) = by_samples.get(&sample_pair) else {
                    continue;
                };
                let writer = streams.writer_for(first, second);
                for (method, pvalue) in pvalues {
                    writer.write_row([
                        record.chrom.clone(),
                        record.pos.to_string(),
                        first.to_string(),
                        second.to_string(),
                        method.clone(),
                        fmt_field(*pvalue),
                    ])?;
                }
            }
        }
    }

    for writer in site_writers.iter_mut() {
        writer.flush()?;
    }
    if let Some(streams) = diff {
        streams.finish()?;
    }

    Ok(accumulator)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sid(s: &str) -> SampleId {
        s.parse().unwrap()
    }

    fn record(value: serde_json::Value) -> PositionRecord {
        serde_json::from_value(value).unwrap()
    }

    fn strand(reads: serde_json::Value, cov: serde_json::Value, phred: serde_json::Value)
    -> serde_json::Value {
        json!({
            "methylatedReads": {"ind1": {"blood": reads}},
            "coverage": {"ind1": {"blood": cov}},
            "phredScore": {"ind1": {"blood": phred}}
        })
    }

    fn single_sample_record(
        w: serde_json::Value,
        c: serde_json::Value,
    ) -> PositionRecord {
        record(json!({
            "chrom": "chr1",
            "pos": 101,
            "genotype": {"ind1": {"blood": "CG"}},
            "meth_cg": {"w": w, "c": c}
        }))
    }

    #[test]
    fn one_present_strand_drives_the_combined_values() {
        let rec = single_sample_record(
            strand(json!(5), json!(10), json!(30)),
            strand(json!(null), json!(null), json!(null)),
        );
        let site = SiteCounts::from_record(&rec, &sid("ind1.blood")).unwrap();

        assert_eq!(site.w.meth_ratio, Some(0.5));
        assert_eq!(site.c.meth_ratio, None);
        assert_eq!(site.methylated_reads, 5);
        assert_eq!(site.coverage, 10);
        assert_eq!(site.phred_score, Some(30));
        assert_eq!(site.meth_ratio, Some(0.5));
    }

    #[test]
    fn both_strands_combine_and_phred_averages_with_floor() {
        let rec = single_sample_record(
            strand(json!(3), json!(10), json!(31)),
            strand(json!(2), json!(10), json!(40)),
        );
        let site = SiteCounts::from_record(&rec, &sid("ind1.blood")).unwrap();

        assert_eq!(site.methylated_reads, 5);
        assert_eq!(site.coverage, 20);
        assert_eq!(site.phred_score, Some(35));
        assert_eq!(site.meth_ratio, Some(0.25));
        assert_eq!(site.w.meth_ratio, Some(0.3));
        assert_eq!(site.c.meth_ratio, Some(0.2));
    }

    #[test]
    fn zero_combined_coverage_yields_no_ratio() {
        let rec = single_sample_record(
            strand(json!(null), json!(null), json!(null)),
            strand(json!(null), json!(null), json!(null)),
        );
        let site = SiteCounts::from_record(&rec, &sid("ind1.blood")).unwrap();

        assert_eq!(site.coverage, 0);
        assert_eq!(site.meth_ratio, None);
        assert_eq!(site.phred_score, None);
    }

    #[test]
    fn zero_reads_leave_the_strand_ratio_undefined() {
        let rec = single_sample_record(
            strand(json!(0), json!(10), json!(30)),
            strand(json!(null), json!(null), json!(null)),
        );
        let site = SiteCounts::from_record(&rec, &sid("ind1.blood")).unwrap();

        assert_eq!(site.w.meth_ratio, None);
        assert_eq!(site.coverage, 10);
        assert_eq!(site.meth_ratio, Some(0.0));
    }

    #[test]
    fn missing_requested_sample_is_a_contract_violation() {
        let rec = single_sample_record(
            strand(json!(5), json!(10), json!(30)),
            strand(json!(null), json!(null), json!(null)),
        );
        assert!(SiteCounts::from_record(&rec, &sid("ind2.blood")).is_err());
    }

    fn two_sample_record(diffmeth: serde_json::Value) -> PositionRecord {
        record(json!({
            "chrom": "chr1",
            "pos": 150,
            "genotype": {"ind1": {"blood": "CG", "saliva": "CG"}},
            "meth_cg": {
                "w": {
                    "methylatedReads": {"ind1": {"blood": 5, "saliva": 2}},
                    "coverage": {"ind1": {"blood": 10, "saliva": 10}},
                    "phredScore": {"ind1": {"blood": 30, "saliva": 30}}
                },
                "c": {
                    "methylatedReads": {"ind1": {"blood": null, "saliva": null}},
                    "coverage": {"ind1": {"blood": null, "saliva": null}},
                    "phredScore": {"ind1": {"blood": null, "saliva": null}}
                }
            },
            "diffmeth_cg": diffmeth
        }))
    }

    #[test]
    fn region_writes_site_rows_with_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path()).unwrap();
        let region = Region::new("chr1", 101, 200);
        let samples = vec![sid("ind1.blood")];

        let records = vec![single_sample_record(
            strand(json!(5), json!(10), json!(30)),
            strand(json!(null), json!(null), json!(null)),
        )];
        let acc = write_region(&layout, &region, &samples, &records).unwrap();

        assert_eq!(acc.ratios(&samples[0]), &[0.5]);
        let text = std::fs::read_to_string(
            dir.path().join("meth_cg/chr1_101_200/ind1.blood.tsv"),
        )
        .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0].split('\t').count(), 15);
        assert_eq!(
            lines[1],
            "chr1\t101\tCG\t5\t10\t30\t.\t.\t.\t5\t10\t30\t0.5\t.\t0.5"
        );
    }

    #[test]
    fn empty_differential_stream_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path()).unwrap();
        let region = Region::new("chr1", 101, 200);
        // Both samples belong to ind1, so only intraindividual pairs exist.
        let samples = vec![sid("ind1.blood"), sid("ind1.saliva")];

        let records = vec![two_sample_record(json!({
            "ind1#ind1": {"blood#saliva": {"fisher": 0.01, "chi2": 0.05}}
        }))];
        write_region(&layout, &region, &samples, &records).unwrap();

        let diff_dir = dir.path().join("diffmeth_cg/chr1_101_200");
        let intra = std::fs::read_to_string(diff_dir.join("intraindividual.tsv")).unwrap();
        let lines: Vec<&str> = intra.lines().collect();
        assert_eq!(lines[0], "chrom\tpos\tsample1\tsample2\tmethod\tpvalue");
        assert_eq!(
            lines[1],
            "chr1\t150\tind1.blood\tind1.saliva\tchi2\t0.05"
        );
        assert_eq!(
            lines[2],
            "chr1\t150\tind1.blood\tind1.saliva\tfisher\t0.01"
        );
        assert!(!diff_dir.join("interindividual.tsv").exists());
    }

    #[test]
    fn absent_pair_keys_are_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path()).unwrap();
        let region = Region::new("chr1", 101, 200);
        let samples = vec![sid("ind1.blood"), sid("ind1.saliva")];

        let records = vec![two_sample_record(json!({
            "other#other": {"x#y": {"fisher": 0.5}}
        }))];
        write_region(&layout, &region, &samples, &records).unwrap();

        // The differential directory was opened speculatively, but neither
        // stream received rows, so both files are gone.
        let diff_dir = dir.path().join("diffmeth_cg/chr1_101_200");
        assert!(!diff_dir.join("intraindividual.tsv").exists());
        assert!(!diff_dir.join("interindividual.tsv").exists());
    }
}
