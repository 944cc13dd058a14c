//! File abstraction handed to decoder factories

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file that a decoder can read: either a path on disk or bytes already in
/// memory (ROM data packs, embedded assets).
#[derive(Clone)]
pub struct FileHandle {
    name: String,
    source: FileSource,
}

#[derive(Clone)]
enum FileSource {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

impl FileHandle {
    /// Handle to a file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            name: path.display().to_string(),
            source: FileSource::Disk(path.to_path_buf()),
        }
    }

    /// Handle to in-memory bytes identified by `name` (extension included)
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Memory(bytes.into()),
        }
    }

    /// Identity used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text after the final `.` of the file name, or `""` when there is none.
    ///
    /// Only the last path component is considered, so `music.d/theme` has no
    /// extension.
    pub fn extension(&self) -> &str {
        let file_name = self
            .name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.name.as_str());
        match file_name.rfind('.') {
            Some(dot) => &file_name[dot + 1..],
            None => "",
        }
    }

    /// Read the whole file
    pub fn read_bytes(&self) -> io::Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Disk(path) => Ok(std::fs::read(path)?.into()),
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            FileSource::Disk(_) => "disk",
            FileSource::Memory(_) => "memory",
        };
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("source", &kind)
            .finish()
    }
}
