//! Region list reader.
//!
//! The input is a BED-style tab-separated listing of `chrom start end` rows
//! with half-open 0-based coordinates. Rows stream lazily, one [`Region`]
//! each; any row that does not parse aborts the run, a truncated region list
//! must never be processed silently.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use itertools::Itertools;

use crate::data_structs::Region;

/// Streaming reader over a tab-separated region listing.
pub struct RegionReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
}

impl RegionReader<File> {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("cannot open region file {}", path.display()))?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> RegionReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();
        Self { records }
    }
}

impl<R: Read> Iterator for RegionReader<R> {
    type Item = Result<Region>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(anyhow!(e).context("invalid region file"))),
        };
        Some(parse_row(&record))
    }
}

fn parse_row(record: &csv::StringRecord) -> Result<Region> {
    let invalid = || anyhow!("invalid region file: bad row `{}`", record.iter().join("\t"));
    let chrom = record.get(0).ok_or_else(invalid)?;
    let start: u64 = record
        .get(1)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(invalid)?;
    let end: u64 = record
        .get(2)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(invalid)?;
    Ok(Region::from_bed_row(chrom, start, end))
}

/// Counts the rows of a region file, for progress display.
pub fn count_regions(path: &Path) -> Result<usize> {
    let file =
        File::open(path).with_context(|| format!("cannot open region file {}", path.display()))?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        line.with_context(|| format!("cannot read region file {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_half_open_rows_to_closed_regions() {
        let input = "chr1\t100\t200\nchr2\t0\t50\n";
        let regions: Vec<Region> = RegionReader::from_reader(input.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            regions,
            vec![Region::new("chr1", 101, 200), Region::new("chr2", 1, 50)]
        );
    }

    #[test]
    fn extra_columns_are_ignored() {
        let input = "chr1\t100\t200\tname\t0\t+\n";
        let regions: Vec<Region> = RegionReader::from_reader(input.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(regions, vec![Region::new("chr1", 101, 200)]);
    }

    #[test]
    fn malformed_rows_are_fatal() {
        let with_text = "chr1\tstart\t200\n";
        assert!(RegionReader::from_reader(with_text.as_bytes())
            .collect::<Result<Vec<_>>>()
            .is_err());

        let too_short = "chr1\t100\n";
        assert!(RegionReader::from_reader(too_short.as_bytes())
            .collect::<Result<Vec<_>>>()
            .is_err());
    }

    #[test]
    fn counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.bed");
        std::fs::write(&path, "chr1\t0\t10\nchr1\t10\t20\nchr2\t0\t5\n").unwrap();
        assert_eq!(count_regions(&path).unwrap(), 3);
    }
}
