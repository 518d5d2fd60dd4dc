pub mod loader;
pub mod metadata;
pub mod partitioned;

pub use loader::{DicomDataset, Description};
pub use metadata::{tabulate, MetadataTable, MetadataValue, EXCLUDED_ELEMENTS};
pub use partitioned::{PartitionDescription, PartitionedDicomDataset};
