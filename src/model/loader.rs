use std::fmt;

use snafu::ResultExt;

use crate::decoder::{DicomDecoder, StandardDecoder};
use crate::error::{DecodeSnafu, NormalizeSnafu, OpenSnafu, Result};
use crate::filesystem::{filepath_str, split_protocol, FileSystem, LocalFileSystem};
use crate::image_pipeline::NormalizedImage;
use crate::model::{tabulate, MetadataTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub filepath: String,
    pub protocol: String,
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filepath={}, protocol={}", self.filepath, self.protocol)
    }
}

/// A single DICOM file, loaded as a metadata table and an 8-bit grayscale image.
///
/// The file system and the decoder are injected,
/// so the same dataset works for local files, object stores and tests.
#[derive(Debug, Clone)]
pub struct DicomDataset<F = LocalFileSystem, C = StandardDecoder> {
    protocol: String,
    filepath: String,
    fs: F,
    decoder: C,
}

impl DicomDataset {
    pub fn local(filepath: &str) -> Self {
        Self::new(filepath, LocalFileSystem, StandardDecoder)
    }
}

impl<F, C> DicomDataset<F, C>
where
    F: FileSystem,
    C: DicomDecoder,
{
    pub fn new(filepath: &str, fs: F, decoder: C) -> Self {
        let (protocol, filepath) = split_protocol(filepath);
        DicomDataset {
            protocol,
            filepath,
            fs,
            decoder,
        }
    }

    /// Nothing is returned unless both the table and the image succeed.
    pub fn load(&self) -> Result<(MetadataTable, NormalizedImage)> {
        let load_path = filepath_str(&self.filepath, &self.protocol);
        log::info!("Loading DICOM file: {load_path}");

        let decoded = {
            let mut stream = self
                .fs
                .open(&load_path)
                .context(OpenSnafu { path: &load_path })?;
            self.decoder
                .decode(&mut *stream)
                .context(DecodeSnafu { path: &load_path })?
        };

        let table = tabulate(decoded.elements);
        let image = decoded
            .pixels
            .normalize()
            .context(NormalizeSnafu { path: &load_path })?;
        log::debug!(
            "{load_path}: {} metadata columns, image shape {:?}",
            table.len(),
            image.shape()
        );

        Ok((table, image))
    }

    /// Writing DICOM is not supported: the data is discarded.
    pub fn save(&self, _data: &NormalizedImage) -> Result<()> {
        log::debug!(
            "Saving is not supported, discarding data for {}",
            filepath_str(&self.filepath, &self.protocol)
        );
        Ok(())
    }

    pub fn describe(&self) -> Description {
        Description {
            filepath: self.filepath.clone(),
            protocol: self.protocol.clone(),
        }
    }
}
