//! Input and output: the HTTP fetcher, the region list reader and the
//! on-disk TSV layout.

pub mod bed;
pub mod http;
pub mod output;
