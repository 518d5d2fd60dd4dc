use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use walkdir::WalkDir;

pub const LOCAL_PROTOCOL: &str = "file";

const PROTOCOL_SEPARATOR: &str = "://";

/// Splits a URI-like path into its storage protocol and the remaining path.
///
/// Paths without a `protocol://` prefix are local files.
pub fn split_protocol(filepath: &str) -> (String, String) {
    match filepath.split_once(PROTOCOL_SEPARATOR) {
        Some((protocol, path)) if is_protocol(protocol) => {
            (protocol.to_ascii_lowercase(), path.to_string())
        }
        _ => (LOCAL_PROTOCOL.to_string(), filepath.to_string()),
    }
}

// Single letters are Windows drive prefixes, not protocols.
fn is_protocol(candidate: &str) -> bool {
    candidate.len() > 1
        && candidate
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

/// Joins a protocol and a path back into the form handed to a [`FileSystem`].
pub fn filepath_str(path: &str, protocol: &str) -> String {
    if protocol == LOCAL_PROTOCOL {
        path.to_string()
    } else {
        format!("{protocol}{PROTOCOL_SEPARATOR}{path}")
    }
}

pub trait FileSystem {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>>;

    /// Lists every file below the directory `path`, sorted.
    fn list(&self, path: &str) -> io::Result<Vec<String>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("listing `{path}` is not supported by this file system"),
        ))
    }
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        (**self).open(path)
    }

    fn list(&self, path: &str) -> io::Result<Vec<String>> {
        (**self).list(path)
    }
}

impl<T: FileSystem + ?Sized> FileSystem for Arc<T> {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        (**self).open(path)
    }

    fn list(&self, path: &str) -> io::Result<Vec<String>> {
        (**self).list(path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn local_path(path: &str) -> io::Result<PathBuf> {
        match split_protocol(path) {
            (protocol, path) if protocol == LOCAL_PROTOCOL => Ok(PathBuf::from(path)),
            (protocol, _) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("protocol `{protocol}` is not served by the local file system"),
            )),
        }
    }
}

impl FileSystem for LocalFileSystem {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        let file = File::open(Self::local_path(path)?)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn list(&self, path: &str) -> io::Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(Self::local_path(path)?) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_dir() {
                files.push(entry.path().to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-memory files keyed by their full path, protocol included.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), Arc::from(data.into()));
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }
}

struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        match self.files.get(path) {
            Some(data) => Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(data))))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: `{path}`"),
            )),
        }
    }

    fn list(&self, path: &str) -> io::Result<Vec<String>> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(self
            .files
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect())
    }
}
