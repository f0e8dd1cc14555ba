use std::{collections::HashMap, io, path::PathBuf};

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use crate::upload::Upload;

const TEMP_FILE_PREFIX: &str = "graphql-upload-";

#[derive(Debug, thiserror::Error)]
pub(super) enum FormError {
    #[error("request body too large")]
    TooLarge,
    #[error(transparent)]
    Multipart(multer::Error),
    #[error("could not spool file part: {0}")]
    Io(#[from] io::Error),
}

impl From<multer::Error> for FormError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => FormError::TooLarge,
            err => FormError::Multipart(err),
        }
    }
}

/// Temporary files created while handling one request. They are removed when the guard is
/// dropped, whatever the outcome of the request.
#[derive(Debug, Default)]
pub(super) struct TempFiles {
    paths: Vec<TempPath>,
}

impl TempFiles {
    pub(super) async fn create(&mut self) -> io::Result<(PathBuf, tokio::fs::File)> {
        let (file, path) = tokio::task::spawn_blocking(|| tempfile::Builder::new().prefix(TEMP_FILE_PREFIX).tempfile())
            .await
            .map_err(io::Error::other)??
            .into_parts();

        let location = path.to_path_buf();
        self.paths.push(path);

        Ok((location, file.into()))
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(err) = path.close() {
                tracing::debug!("could not remove temporary upload file: {err}");
            }
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct FormData {
    pub values: HashMap<String, String>,
    pub files: HashMap<String, FormFile>,
}

#[derive(Debug)]
pub(super) struct FormFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub content: FormFileContent,
}

#[derive(Debug)]
pub(super) enum FormFileContent {
    Memory(Bytes),
    Disk(PathBuf),
}

impl FormFile {
    pub(super) fn is_in_memory(&self) -> bool {
        matches!(self.content, FormFileContent::Memory(_))
    }

    /// A fresh upload reading the content from the start.
    pub(super) async fn open(&self) -> io::Result<Upload> {
        match &self.content {
            FormFileContent::Memory(bytes) => Ok(self.upload_from_bytes(bytes.clone())),
            FormFileContent::Disk(path) => self.upload_from_path(path).await,
        }
    }

    pub(super) async fn read_to_bytes(&self) -> io::Result<Bytes> {
        match &self.content {
            FormFileContent::Memory(bytes) => Ok(bytes.clone()),
            FormFileContent::Disk(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }

    pub(super) fn upload_from_bytes(&self, bytes: Bytes) -> Upload {
        Upload::from_bytes(self.filename.clone(), self.content_type.clone(), bytes)
    }

    pub(super) async fn upload_from_path(&self, path: &std::path::Path) -> io::Result<Upload> {
        let file = tokio::fs::File::open(path).await?.into_std().await;
        Ok(Upload::from_file(
            self.filename.clone(),
            self.content_type.clone(),
            self.size,
            file,
        ))
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Limits {
    pub max_upload_size: u64,
    pub max_memory: u64,
}

/// Reads the whole multipart body. The first value or file of a given name wins.
///
/// File parts stay in memory as long as the combined size of the in-memory files fits in
/// `max_memory`, the others are written to temporary files owned by `temp_files`.
pub(super) async fn parse(
    body: Body,
    boundary: String,
    limits: Limits,
    temp_files: &mut TempFiles,
) -> Result<FormData, FormError> {
    let constraints =
        multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limits.max_upload_size));
    let mut multipart = multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut form = FormData::default();
    let mut memory_budget = limits.max_memory;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();

        match field.file_name().map(str::to_owned) {
            None => {
                let value = field.text().await?;
                form.values.entry(name).or_insert(value);
            }
            Some(filename) => {
                let file = spool(field, filename, &mut memory_budget, temp_files).await?;
                form.files.entry(name).or_insert(file);
            }
        }
    }

    Ok(form)
}

async fn spool(
    mut field: multer::Field<'static>,
    filename: String,
    memory_budget: &mut u64,
    temp_files: &mut TempFiles,
) -> Result<FormFile, FormError> {
    let content_type = field.content_type().map(|content_type| content_type.to_string());
    let mut buffer = BytesMut::new();
    let mut disk: Option<(PathBuf, tokio::fs::File)> = None;
    let mut size = 0;

    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;

        match disk.as_mut() {
            Some((_, file)) => file.write_all(&chunk).await?,
            None if size <= *memory_budget => buffer.extend_from_slice(&chunk),
            None => {
                let (path, mut file) = temp_files.create().await?;
                file.write_all(&buffer).await?;
                file.write_all(&chunk).await?;
                buffer = BytesMut::new();
                disk = Some((path, file));
            }
        }
    }

    let content = match disk {
        Some((path, mut file)) => {
            file.flush().await?;
            FormFileContent::Disk(path)
        }
        None => {
            *memory_budget -= size;
            FormFileContent::Memory(buffer.freeze())
        }
    };

    Ok(FormFile {
        filename,
        content_type,
        size,
        content,
    })
}
