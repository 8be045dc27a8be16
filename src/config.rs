//! Startup configuration.
//!
//! Command line flags are parsed with `clap` and flattened into a read-only
//! string map. `CONFIG GET` and every other consumer read from that map.

use std::{collections::HashMap, path::PathBuf};

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 6379;

#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("invalid command line arguments: {0}")]
    InvalidArguments(String),
    #[error("invalid --replicaof value '{0}', expected \"<host> <port>\"")]
    InvalidReplicaOf(String),
}

/// Command line flags accepted by the server binary.
#[derive(Parser, Debug)]
#[command(name = "redis-server", about = "In-memory data structure server")]
struct CliArgs {
    /// Directory holding the snapshot file
    #[arg(long, default_value = ".")]
    dir: String,
    /// Snapshot file name inside `dir`
    #[arg(long, default_value = "dump.rdb")]
    dbfilename: String,
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Upstream primary as "<host> <port>"
    #[arg(long)]
    replicaof: Option<String>,
}

/// Flat, read-only configuration map.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    values: HashMap<String, String>,
    replica_of: Option<(String, u16)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            values: HashMap::from([
                ("dir".to_string(), ".".to_string()),
                ("dbfilename".to_string(), "dump.rdb".to_string()),
                ("port".to_string(), DEFAULT_PORT.to_string()),
            ]),
            replica_of: None,
        }
    }
}

impl Config {
    /// Parses process arguments (including the program name in first position).
    pub fn from_args<I, T>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli_args = CliArgs::try_parse_from(args)
            .map_err(|e| CliError::InvalidArguments(e.to_string()))?;

        let mut values = HashMap::from([
            ("dir".to_string(), cli_args.dir),
            ("dbfilename".to_string(), cli_args.dbfilename),
            ("port".to_string(), cli_args.port.to_string()),
        ]);

        if let Some(replicaof) = cli_args.replicaof {
            values.insert("replicaof".to_string(), replicaof);
        }

        Self::from_values(values)
    }

    /// Builds a configuration from an already flattened map.
    pub fn from_values(values: HashMap<String, String>) -> Result<Self, CliError> {
        let replica_of = match values.get("replicaof") {
            Some(value) => Some(parse_replica_of(value)?),
            None => None,
        };

        Ok(Self { values, replica_of })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn port(&self) -> u16 {
        self.get("port")
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    /// Upstream primary, when this instance runs as a replica.
    pub fn replica_of(&self) -> Option<(&str, u16)> {
        self.replica_of
            .as_ref()
            .map(|(host, port)| (host.as_str(), *port))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(self.get("dir").unwrap_or("."))
            .join(self.get("dbfilename").unwrap_or("dump.rdb"))
    }
}

fn parse_replica_of(value: &str) -> Result<(String, u16), CliError> {
    let parts = value.split_whitespace().collect::<Vec<&str>>();

    let [host, port] = parts.as_slice() else {
        return Err(CliError::InvalidReplicaOf(value.to_string()));
    };

    let port = port
        .parse::<u16>()
        .map_err(|_| CliError::InvalidReplicaOf(value.to_string()))?;

    Ok((host.to_string(), port))
}
