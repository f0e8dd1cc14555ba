use std::{
    io::IsTerminal,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::Parser;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::config::{Config, ConfigError};

mod log;

pub(crate) use self::log::{LogLevel, LogStyle};

const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

#[derive(Debug, Parser)]
#[command(name = "graphql-server", version)]
/// A GraphQL server speaking GET, POST and multipart uploads over HTTP
pub(crate) struct Args {
    /// IP address on which the server will listen for incoming connections. Defaults to 127.0.0.1:8080.
    #[arg(short, long)]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file. Defaults apply when the file does not exist.
    #[arg(long, short, env = "GRAPHQL_SERVER_CONFIG", default_value = "./graphql-server.toml")]
    pub config: PathBuf,
    /// Set the logging level
    #[arg(long = "log", env = "GRAPHQL_SERVER_LOG", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "GRAPHQL_SERVER_LOG_STYLE", default_value_t = LogStyle::Text)]
    pub log_style: LogStyle,
}

impl Args {
    pub(crate) fn config(&self) -> Result<Config, ConfigError> {
        Config::load(&self.config)
    }

    /// The command line takes precedence over the configuration file.
    pub(crate) fn listen_address(&self, config: &Config) -> SocketAddr {
        self.listen_address
            .or(config.network.listen_address)
            .unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }

    pub(crate) fn init_logging(&self) {
        let filter = EnvFilter::new(self.log_level.filter());
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::NONE);

        match self.log_style {
            // for interactive terminals we provide colored output
            LogStyle::Text if std::io::stdout().is_terminal() => subscriber.with_ansi(true).init(),
            // for server logs, colors are off
            LogStyle::Text => subscriber.with_ansi(false).init(),
            LogStyle::Json => subscriber.json().init(),
        }
    }
}

pub(crate) fn parse() -> Args {
    Args::parse()
}
