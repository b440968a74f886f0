//! Core value types shared by the fetching and aggregation steps.

pub mod api;
pub mod region;
pub mod sample;

pub use api::{
    Assembly, DiffMeth, MethCounts, PositionRecord, SampleTable, SampleTree, SegmentRecord,
    SegmentSample, SegmentSamples, StrandTable,
};
pub use region::Region;
pub use sample::SampleId;
