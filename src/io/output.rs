//! On-disk layout and TSV writing.
//!
//! The layout is fixed: `meth_cg/<region>/` and `stats/<region>/` per
//! region, `diffmeth_cg/<region>/` only when differential data exists, and
//! a shared `segments/` directory with one file per region. Directories are
//! created on demand. Every writer is opened once per file and flushed when
//! the region completes, matching the all-or-nothing failure model.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data_structs::Region;

/// Fixed directory layout rooted at the run's output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("cannot create output directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `meth_cg/<region>/`, created on demand.
    pub fn meth_dir(&self, region: &Region) -> Result<PathBuf> {
        self.ensure(Path::new("meth_cg").join(region.dir_name()))
    }

    /// `stats/<region>/`, created on demand.
    pub fn stats_dir(&self, region: &Region) -> Result<PathBuf> {
        self.ensure(Path::new("stats").join(region.dir_name()))
    }

    /// `diffmeth_cg/<region>/`, created on demand.
    pub fn diffmeth_dir(&self, region: &Region) -> Result<PathBuf> {
        self.ensure(Path::new("diffmeth_cg").join(region.dir_name()))
    }

    /// `segments/`, shared across regions, created on demand.
    pub fn segments_dir(&self) -> Result<PathBuf> {
        self.ensure(PathBuf::from("segments"))
    }

    fn ensure(&self, relative: PathBuf) -> Result<PathBuf> {
        let dir = self.root.join(relative);
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create output directory {}", dir.display()))?;
        Ok(dir)
    }
}

/// Tab-separated writer with a one-line header written at creation.
pub struct TsvWriter {
    inner: csv::Writer<File>,
}

impl TsvWriter {
    pub fn create<H, F>(path: &Path, header: H) -> Result<Self>
    where
        H: IntoIterator<Item = F>,
        F: AsRef<[u8]>, {
        let mut inner = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("cannot create output file {}", path.display()))?;
        inner
            .write_record(header)
            .with_context(|| format!("cannot write header to {}", path.display()))?;
        Ok(Self { inner })
    }

    pub fn write_row<I, F>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>, {
        self.inner.write_record(fields).context("cannot write row")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("cannot flush output file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_creates_directories_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("out")).unwrap();
        let region = Region::new("chr1", 101, 200);

        let meth = layout.meth_dir(&region).unwrap();
        assert!(meth.ends_with("meth_cg/chr1_101_200"));
        assert!(meth.is_dir());

        assert!(!dir.path().join("out/diffmeth_cg").exists());
        layout.diffmeth_dir(&region).unwrap();
        assert!(dir.path().join("out/diffmeth_cg/chr1_101_200").is_dir());
    }

    #[test]
    fn tsv_writer_emits_header_and_tab_separated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tsv");

        let mut writer = TsvWriter::create(&path, ["#chrom", "pos", "value"]).unwrap();
        writer.write_row(["chr1", "101", "."]).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "#chrom\tpos\tvalue\nchr1\t101\t.\n");
    }
}
