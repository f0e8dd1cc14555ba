use std::{
    fs::File,
    io::{self, Cursor, Read, Seek, SeekFrom, Write},
};

use bytes::Bytes;
use tempfile::NamedTempFile;

/// A file received through a multipart request.
///
/// Each upload has its own read position, even when several uploads share the same underlying
/// content.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    /// Size in bytes as received.
    pub size: u64,
    content: UploadContent,
}

#[derive(Debug)]
enum UploadContent {
    Memory(Cursor<Bytes>),
    File(File),
}

impl Upload {
    pub fn from_bytes(filename: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Upload {
            filename: filename.into(),
            content_type,
            size: bytes.len() as u64,
            content: UploadContent::Memory(Cursor::new(bytes)),
        }
    }

    pub fn from_file(filename: impl Into<String>, content_type: Option<String>, size: u64, file: File) -> Self {
        Upload {
            filename: filename.into(),
            content_type,
            size,
            content: UploadContent::File(file),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.content, UploadContent::Memory(_))
    }

    /// Reads everything from the current position on.
    pub fn read_to_vec(&mut self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(usize::try_from(self.size).unwrap_or_default());
        self.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Converts the upload into a file handle positioned where this upload was, in-memory content
    /// is written to an anonymous temporary file first.
    pub fn into_file(self) -> io::Result<File> {
        match self.content {
            UploadContent::File(file) => Ok(file),
            UploadContent::Memory(cursor) => {
                let position = cursor.position();
                let mut file = tempfile::tempfile()?;
                file.write_all(cursor.get_ref())?;
                file.seek(SeekFrom::Start(position))?;
                Ok(file)
            }
        }
    }
}

/// Writes in-memory uploads to temporary files, once per shared buffer.
///
/// Blocking, run it outside of the async runtime. The files are unlinked when the spool is
/// dropped, the handles it returned stay readable.
#[derive(Default)]
pub(crate) struct Spool {
    files: Vec<(Bytes, NamedTempFile)>,
}

impl Spool {
    /// Like [`Upload::into_file`], uploads cloned from the same buffer share one temporary file
    /// while keeping their own positions.
    pub(crate) fn file(&mut self, upload: Upload) -> io::Result<File> {
        let cursor = match upload.content {
            UploadContent::File(file) => return Ok(file),
            UploadContent::Memory(cursor) => cursor,
        };

        let position = cursor.position();
        let bytes = cursor.into_inner();

        let spooled = self
            .files
            .iter()
            .find(|(spooled, _)| spooled.as_ptr() == bytes.as_ptr() && spooled.len() == bytes.len());

        let mut file = match spooled {
            Some((_, temp_file)) => temp_file.reopen()?,
            None => {
                let mut temp_file = tempfile::Builder::new().prefix("graphql-upload-").tempfile()?;
                temp_file.write_all(&bytes)?;
                let file = temp_file.reopen()?;
                self.files.push((bytes, temp_file));
                file
            }
        };

        file.seek(SeekFrom::Start(position))?;
        Ok(file)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.files.len()
    }
}

impl Read for Upload {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.content {
            UploadContent::Memory(cursor) => cursor.read(buf),
            UploadContent::File(file) => file.read(buf),
        }
    }
}

impl Seek for Upload {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.content {
            UploadContent::Memory(cursor) => cursor.seek(pos),
            UploadContent::File(file) => file.seek(pos),
        }
    }
}
