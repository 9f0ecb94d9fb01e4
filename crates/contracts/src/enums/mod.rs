pub mod feed_type;
pub mod operation_type;
pub mod processing_status;
pub mod region;

pub use feed_type::FeedType;
pub use operation_type::OperationType;
pub use processing_status::ProcessingStatus;
pub use region::Region;
