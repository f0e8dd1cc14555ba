use std::collections::BTreeMap;

use axum::body::Body;
use headers::{ContentLength, HeaderMapExt};
use http::{header, Method, Request, StatusCode};
use tokio::io::AsyncWriteExt;

use self::form::{FormData, FormError, FormFile, FormFileContent, Limits, TempFiles};
use super::{is_upgrade, media_type, Transport};
use crate::{
    dispatch,
    executor::GraphExecutor,
    request::{RawParams, TraceTiming},
    response,
};

mod form;

const DEFAULT_MAX_UPLOAD_SIZE: u64 = 32 << 20;
const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

const PARSE_FAILED: &str = "failed to parse multipart form";
const BODY_TOO_LARGE: &str = "failed to parse multipart form, request body too large";

/// File uploads following the [GraphQL multipart request
/// specification](https://github.com/jaydenseric/graphql-multipart-request-spec): an
/// `operations` field holding the JSON request, a `map` field binding each file part to one
/// or more paths in the variables, and the file parts themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartForm {
    /// Maximum size of the whole request body in bytes. Zero means 32 MiB.
    ///
    /// A body over the limit is answered with 422, including when the declared
    /// `Content-Length` alone exceeds it and nothing is read. Other GraphQL multipart handlers
    /// answer that early rejection with 200 and the same error body.
    pub max_upload_size: u64,
    /// Maximum number of bytes of file content held in memory, the rest is written to
    /// temporary files. Zero means 32 MiB.
    pub max_memory: u64,
}

impl MultipartForm {
    pub fn new(max_upload_size: u64, max_memory: u64) -> Self {
        MultipartForm {
            max_upload_size,
            max_memory,
        }
    }

    pub fn max_upload_size(&self) -> u64 {
        match self.max_upload_size {
            0 => DEFAULT_MAX_UPLOAD_SIZE,
            size => size,
        }
    }

    pub fn max_memory(&self) -> u64 {
        match self.max_memory {
            0 => DEFAULT_MAX_MEMORY,
            size => size,
        }
    }

    async fn decode(
        &self,
        request: Request<Body>,
        temp_files: &mut TempFiles,
    ) -> Result<(http::request::Parts, RawParams), http::Response<Body>> {
        let mut read_time = TraceTiming::start();
        let (parts, body) = request.into_parts();

        let content_length = parts.headers.typed_get::<ContentLength>().map(|ContentLength(length)| length);
        if content_length.is_some_and(|length| length > self.max_upload_size()) {
            return Err(response::error(StatusCode::UNPROCESSABLE_ENTITY, BODY_TOO_LARGE));
        }

        let boundary = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|content_type| multer::parse_boundary(content_type).ok())
            .ok_or_else(|| response::error(StatusCode::UNPROCESSABLE_ENTITY, PARSE_FAILED))?;

        let limits = Limits {
            max_upload_size: self.max_upload_size(),
            max_memory: self.max_memory(),
        };

        let mut form = form::parse(body, boundary, limits, temp_files)
            .await
            .map_err(|err| {
                tracing::debug!("invalid multipart body: {err}");
                match err {
                    FormError::TooLarge => response::error(StatusCode::UNPROCESSABLE_ENTITY, BODY_TOO_LARGE),
                    FormError::Multipart(_) | FormError::Io(_) => {
                        response::error(StatusCode::UNPROCESSABLE_ENTITY, PARSE_FAILED)
                    }
                }
            })?;

        let mut params: RawParams = decode_field(&form, "operations")
            .ok_or_else(|| unprocessable("operations form field could not be decoded".into()))?;

        let map: BTreeMap<String, Vec<String>> = decode_field::<Option<BTreeMap<String, Vec<String>>>>(&form, "map")
            .ok_or_else(|| unprocessable("map form field could not be decoded".into()))?
            .unwrap_or_default();

        for (key, paths) in map {
            if paths.is_empty() {
                return Err(unprocessable(format!("invalid empty operations paths list for key {key}")));
            }

            let Some(file) = form.files.remove(&key) else {
                return Err(unprocessable(format!("failed to get key {key} from form")));
            };

            match paths.as_slice() {
                [path] => {
                    let upload = file.open().await.map_err(|err| {
                        tracing::warn!("could not open upload for key {key}: {err}");
                        unprocessable(format!("failed to open temp file for key {key}"))
                    })?;

                    params
                        .add_upload(upload, &key, path)
                        .map_err(|error| response::errors(StatusCode::UNPROCESSABLE_ENTITY, vec![error]))?;
                }
                paths => {
                    let in_memory = match content_length {
                        Some(length) => length < self.max_memory(),
                        None => file.is_in_memory(),
                    };

                    if in_memory {
                        attach_from_memory(&mut params, &file, &key, paths).await?;
                    } else {
                        attach_from_disk(&mut params, &file, &key, paths, temp_files).await?;
                    }
                }
            }
        }

        read_time.finish();
        params.read_time = read_time;

        Ok((parts, params))
    }
}

#[async_trait::async_trait]
impl Transport for MultipartForm {
    fn name(&self) -> &'static str {
        "multipart"
    }

    fn supports(&self, request: &Request<Body>) -> bool {
        request.method() == Method::POST
            && !is_upgrade(request.headers())
            && media_type(request.headers()).is_some_and(|media_type| {
                media_type.type_() == mime::MULTIPART && media_type.subtype() == mime::FORM_DATA
            })
    }

    async fn execute(&self, request: Request<Body>, executor: &dyn GraphExecutor) -> http::Response<Body> {
        // Outlives the response construction, removing every temporary file of this request
        // once dropped.
        let mut temp_files = TempFiles::default();

        match self.decode(request, &mut temp_files).await {
            Ok((parts, params)) => dispatch::run(executor, &parts, params).await,
            Err(response) => response,
        }
    }
}

/// A missing field decodes like an empty string, which is invalid JSON.
fn decode_field<T: serde::de::DeserializeOwned>(form: &FormData, name: &str) -> Option<T> {
    let value = form.values.get(name).map(String::as_str).unwrap_or_default();

    serde_json::from_str(value)
        .map_err(|err| tracing::debug!("invalid {name} form field: {err}"))
        .ok()
}

fn unprocessable(message: String) -> http::Response<Body> {
    response::error(StatusCode::UNPROCESSABLE_ENTITY, message)
}

/// Every path gets its own cursor over a single in-memory copy.
async fn attach_from_memory(
    params: &mut RawParams,
    file: &FormFile,
    key: &str,
    paths: &[String],
) -> Result<(), http::Response<Body>> {
    let bytes = file.read_to_bytes().await.map_err(|err| {
        tracing::warn!("could not read upload for key {key}: {err}");
        unprocessable(format!("failed to read file for key {key}"))
    })?;

    for path in paths {
        params
            .add_upload(file.upload_from_bytes(bytes.clone()), key, path)
            .map_err(|error| response::errors(StatusCode::UNPROCESSABLE_ENTITY, vec![error]))?;
    }

    Ok(())
}

/// Every path gets its own handle on a single temporary file.
async fn attach_from_disk(
    params: &mut RawParams,
    file: &FormFile,
    key: &str,
    paths: &[String],
    temp_files: &mut TempFiles,
) -> Result<(), http::Response<Body>> {
    let location = match &file.content {
        FormFileContent::Disk(path) => path.clone(),
        FormFileContent::Memory(bytes) => {
            let (path, mut temp_file) = temp_files.create().await.map_err(|err| {
                tracing::warn!("could not create temporary file for key {key}: {err}");
                unprocessable(format!("failed to create temp file for key {key}"))
            })?;

            let copied = async {
                temp_file.write_all(bytes).await?;
                temp_file.flush().await
            };
            copied.await.map_err(|err| {
                tracing::warn!("could not copy upload to temporary file for key {key}: {err}");
                unprocessable(format!("failed to copy to temp file for key {key}"))
            })?;

            path
        }
    };

    for path in paths {
        let upload = file.upload_from_path(&location).await.map_err(|err| {
            tracing::warn!("could not open temporary file for key {key}: {err}");
            unprocessable(format!("failed to open temp file for key {key}"))
        })?;

        params
            .add_upload(upload, key, path)
            .map_err(|error| response::errors(StatusCode::UNPROCESSABLE_ENTITY, vec![error]))?;
    }

    Ok(())
}
