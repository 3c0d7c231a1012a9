pub mod fitness;

pub use fitness::{
    AggregateResponse, Bucket, DataPoint, Dataset, PointValue, SegmentDataset, Session,
    SessionList,
};
