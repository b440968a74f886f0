use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A closed 1-based genomic interval.
///
/// One region drives one full fetch-compute-write cycle. Regions are parsed
/// from half-open 0-based BED rows with [`Region::from_bed_row`], which
/// shifts the start by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    chrom: String,
    start: u64,
    end:   u64,
}

impl Region {
    /// Creates a region from already closed 1-based coordinates.
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// Converts one half-open 0-based BED row to a closed region.
    pub fn from_bed_row(chrom: &str, start: u64, end: u64) -> Self {
        Self::new(chrom, start + 1, end)
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Query path component, `chrom:start-end`.
    pub fn query(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.start, self.end)
    }

    /// Directory-safe name, `chrom_start_end`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}_{}", self.chrom, self.start, self.end)
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query())
    }
}
