use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::{error::GraphqlError, upload::Upload};

/// When the transport started and finished reading the request.
#[derive(Debug, Clone, Copy)]
pub struct TraceTiming {
    pub start: Instant,
    pub end: Instant,
}

impl TraceTiming {
    pub fn start() -> Self {
        let now = Instant::now();
        TraceTiming { start: now, end: now }
    }

    pub fn finish(&mut self) {
        self.end = Instant::now();
    }

    pub fn duration(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }
}

impl Default for TraceTiming {
    fn default() -> Self {
        Self::start()
    }
}

/// An upload bound to a location inside the variables.
#[derive(Debug)]
pub struct AttachedUpload {
    /// Name of the multipart form part the upload came from.
    pub key: String,
    /// Dotted path, always starting with `variables.`
    pub path: String,
    pub upload: Upload,
}

/// A decoded but not yet validated GraphQL request.
///
/// `null` for `query`, `variables` or `extensions` is treated as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParams {
    #[serde(default, deserialize_with = "null_as_default")]
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extensions: Map<String, Value>,
    #[serde(skip)]
    pub uploads: Vec<AttachedUpload>,
    #[serde(skip)]
    pub read_time: TraceTiming,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawParams {
    pub fn new(query: impl Into<String>) -> Self {
        RawParams {
            query: query.into(),
            ..Default::default()
        }
    }

    /// The operation name, with an empty name treated as absent.
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Binds `upload` to `path` of the variables, e.g. `variables.files.1` or
    /// `variables.input.avatar`.
    ///
    /// Every segment but the last one must resolve to an existing list element or object member.
    /// The last one may name a missing object member, which is then created. The value found at
    /// the path is replaced by `null` and the upload is recorded alongside it. `key` is only used
    /// in error messages. Failures are protocol errors and leave the variables untouched.
    pub fn add_upload(&mut self, upload: Upload, key: &str, path: &str) -> Result<(), GraphqlError> {
        let variable_path = path
            .strip_prefix("variables.")
            .filter(|variable_path| variable_path.split('.').all(|segment| !segment.is_empty()))
            .ok_or_else(|| GraphqlError::protocol(format!("invalid operations paths for key {key}")))?;

        if self.uploads.iter().any(|attached| attached.path == path) {
            return Err(GraphqlError::protocol(format!(
                "upload already attached at path {path}, key {key}"
            )));
        }

        let slot = upload_slot(&mut self.variables, variable_path).ok_or_else(|| {
            GraphqlError::protocol(format!("invalid operations paths for key {key}, path {path}"))
        })?;
        *slot = Value::Null;

        self.uploads.push(AttachedUpload {
            key: key.to_owned(),
            path: path.to_owned(),
            upload,
        });

        Ok(())
    }

    pub fn upload(&self, path: &str) -> Option<&Upload> {
        self.uploads
            .iter()
            .find(|attached| attached.path == path)
            .map(|attached| &attached.upload)
    }
}

fn upload_slot<'a>(variables: &'a mut Map<String, Value>, path: &str) -> Option<&'a mut Value> {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        return Some(variables.entry(path).or_insert(Value::Null));
    };

    let mut parents = parents.split('.');
    let initial = variables.get_mut(parents.next()?)?;

    match parents.try_fold(initial, |current, segment| child(current, segment))? {
        Value::Array(items) => items.get_mut(leaf.parse::<usize>().ok()?),
        Value::Object(members) => Some(members.entry(leaf).or_insert(Value::Null)),
        _ => None,
    }
}

fn child<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        Value::Object(members) => members.get_mut(segment),
        _ => None,
    }
}
