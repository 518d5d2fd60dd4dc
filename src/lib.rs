//! Load DICOM files for data pipelines.
//!
//! A [`DicomDataset`] reads one file through an injected [`FileSystem`],
//! decodes it with an injected [`DicomDecoder`] and returns:
//!
//! - a single-row [`MetadataTable`] of every element except the pixel payload
//!   and the file meta version marker;
//! - the pixel array stretched linearly into 8-bit grayscale
//!   ([`NormalizedImage`]), keeping its shape.
//!
//! ```no_run
//! use dicom_normalize::DicomDataset;
//!
//! let (metadata, image) = DicomDataset::local("data/01_raw/ct.dcm").load()?;
//! println!("{} columns, image {:?}", metadata.len(), image.shape());
//! # Ok::<(), dicom_normalize::Error>(())
//! ```
//!
//! Writing DICOM files is not supported; [`DicomDataset::save`] discards its input.

pub mod decoder;
pub mod error;
pub mod filesystem;
pub mod image_pipeline;
pub mod model;
pub mod utils;

pub use decoder::{DecodedDicom, DicomDecoder, StandardDecoder};
pub use error::{DecodeError, Error, NormalizeError, Result};
pub use filesystem::{split_protocol, FileSystem, LocalFileSystem, MemoryFileSystem};
pub use image_pipeline::{normalize, to_gray_image, NormalizedImage, RawPixels};
pub use model::{
    tabulate, Description, DicomDataset, MetadataTable, MetadataValue, PartitionDescription,
    PartitionedDicomDataset,
};
