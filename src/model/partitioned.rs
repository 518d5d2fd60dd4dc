use std::collections::BTreeMap;

use snafu::{ensure, ResultExt};

use crate::decoder::{DicomDecoder, StandardDecoder};
use crate::error::{ListSnafu, NoPartitionsSnafu, Result};
use crate::filesystem::{filepath_str, split_protocol, FileSystem, LocalFileSystem};
use crate::model::loader::DicomDataset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescription {
    pub path: String,
    pub protocol: String,
    pub filename_suffix: String,
}

/// A directory of DICOM files, one dataset per file.
///
/// Partitions are keyed by their path relative to the directory,
/// without the filename suffix.
#[derive(Debug, Clone)]
pub struct PartitionedDicomDataset<F = LocalFileSystem, C = StandardDecoder> {
    protocol: String,
    path: String,
    filename_suffix: String,
    fs: F,
    decoder: C,
}

impl PartitionedDicomDataset {
    pub fn local(path: &str) -> Self {
        Self::new(path, LocalFileSystem, StandardDecoder)
    }
}

impl<F, C> PartitionedDicomDataset<F, C>
where
    F: FileSystem + Clone,
    C: DicomDecoder + Clone,
{
    pub fn new(path: &str, fs: F, decoder: C) -> Self {
        let (protocol, path) = split_protocol(path);
        PartitionedDicomDataset {
            protocol,
            path: path.trim_end_matches('/').to_string(),
            filename_suffix: String::new(),
            fs,
            decoder,
        }
    }

    /// Only files ending with `suffix` become partitions.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.filename_suffix = suffix.into();
        self
    }

    /// Lists the partitions as `(partition id, full path)` pairs, ordered by id.
    pub fn partitions(&self) -> Result<Vec<(String, String)>> {
        let dir = filepath_str(&self.path, &self.protocol);
        let files = self.fs.list(&dir).context(ListSnafu { path: &dir })?;

        let mut partitions: Vec<(String, String)> = files
            .into_iter()
            .filter(|file| file.ends_with(&self.filename_suffix))
            .filter_map(|file| {
                let relative = file.strip_prefix(&dir)?.trim_start_matches(['/', '\\']);
                let id = relative.strip_suffix(self.filename_suffix.as_str())?;
                Some((id.to_string(), file.clone()))
            })
            .collect();
        partitions.sort();

        ensure!(!partitions.is_empty(), NoPartitionsSnafu { path: &dir });
        log::debug!("Found {} partitions under {dir}", partitions.len());
        Ok(partitions)
    }

    /// One dataset per partition. Nothing is read until a dataset is loaded.
    pub fn load(&self) -> Result<BTreeMap<String, DicomDataset<F, C>>> {
        Ok(self
            .partitions()?
            .into_iter()
            .map(|(id, file)| {
                let dataset = DicomDataset::new(&file, self.fs.clone(), self.decoder.clone());
                (id, dataset)
            })
            .collect())
    }

    pub fn describe(&self) -> PartitionDescription {
        PartitionDescription {
            path: self.path.clone(),
            protocol: self.protocol.clone(),
            filename_suffix: self.filename_suffix.clone(),
        }
    }
}
