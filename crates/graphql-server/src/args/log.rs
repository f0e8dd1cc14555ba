use std::fmt;

use clap::ValueEnum;

/// Crates whose logs are shown below the `trace` level.
const CRATES: [&str; 2] = ["graphql_server", "graphql_transport"];

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Completely disables logging
    Off,
    /// Only errors from the server and the GraphQL transports
    Error,
    /// Warnings and errors from the server and the GraphQL transports
    Warn,
    /// Info, warning and error messages from the server and the GraphQL transports
    #[default]
    Info,
    /// Debug, info, warning and error messages from the server and the GraphQL transports
    Debug,
    /// Trace, debug, info, warning and error messages from all dependencies
    Trace,
}

impl LogLevel {
    /// The `EnvFilter` directives for this level.
    pub(crate) fn filter(self) -> String {
        match self {
            LogLevel::Off | LogLevel::Trace => self.to_string(),
            level => {
                let mut directives: Vec<String> = CRATES.iter().map(|name| format!("{name}={level}")).collect();
                directives.push(LogLevel::Off.to_string());
                directives.join(",")
            }
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Standard text
    #[default]
    Text,
    /// JSON objects
    Json,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self, f)
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self, f)
    }
}

/// Writes the name the value has on the command line.
fn write_value(value: &impl ValueEnum, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = value.to_possible_value().ok_or(fmt::Error)?;
    f.write_str(value.get_name())
}
