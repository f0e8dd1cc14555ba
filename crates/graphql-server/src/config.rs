use std::{io, net::SocketAddr, path::Path};

use serde_with::DisplayFromStr;
use size::Size;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("could not read the configuration file {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("could not parse the configuration file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Configuration of the GraphQL server
pub(crate) struct Config {
    /// Server bind settings
    pub network: NetworkConfig,
    /// Where the GraphQL endpoint is mounted and which features the schema enables
    pub graph: GraphConfig,
    /// The GraphiQL page
    pub playground: PlaygroundConfig,
    /// Limits of the multipart upload transport
    pub uploads: UploadsConfig,
    /// Automatic persisted queries
    pub persisted_queries: PersistedQueriesConfig,
}

impl Config {
    /// Reads the configuration from a TOML file. A missing file yields the defaults.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no configuration file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct NetworkConfig {
    pub listen_address: Option<SocketAddr>,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GraphConfig {
    /// Path of the GraphQL endpoint. Default: `/query`
    pub path: String,
    /// Whether the schema answers introspection queries. Default: `true`
    pub introspection: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: "/query".to_string(),
            introspection: true,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlaygroundConfig {
    pub enabled: bool,
    /// Path serving the page. Default: `/`
    pub path: String,
    pub title: Option<String>,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/".to_string(),
            title: None,
        }
    }
}

#[serde_with::serde_as]
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct UploadsConfig {
    /// Maximum size of a whole multipart request. Default: 32 MiB
    #[serde_as(as = "DisplayFromStr")]
    pub max_upload_size: Size,
    /// Files are kept in memory until they reach this size, then spooled to disk. Default: 32 MiB
    #[serde_as(as = "DisplayFromStr")]
    pub max_memory: Size,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_upload_size: Size::from_mebibytes(32),
            max_memory: Size::from_mebibytes(32),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PersistedQueriesConfig {
    pub enabled: bool,
    /// Number of queries kept in the LRU cache
    pub cache_size: usize,
}

impl Default for PersistedQueriesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_size: 100,
        }
    }
}
