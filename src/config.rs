use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use thiserror::Error;

const DEFAULT_CONTACTS_FILE: &str = "contacts.csv";
const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CONTACTS_HTTP_HOST must be an IP address, got '{0}'")]
    InvalidHost(String),
    #[error("CONTACTS_HTTP_PORT must be a valid u16, got '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileConfig {
    pub path: PathBuf,
    pub archive_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub contacts_file: PathBuf,
    pub http_addr: SocketAddr,
    pub log_file: Option<LogFileConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let contacts_file = lookup("CONTACTS_FILE")
            .unwrap_or_else(|| DEFAULT_CONTACTS_FILE.to_string())
            .into();

        let host = lookup("CONTACTS_HTTP_HOST").unwrap_or_else(|| DEFAULT_HTTP_HOST.to_string());
        let host = host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host.clone()))?;
        let port = match lookup("CONTACTS_HTTP_PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?,
            None => DEFAULT_HTTP_PORT,
        };

        let log_file = lookup("LOG_FILE_PATH").map(|path| LogFileConfig {
            archive_pattern: lookup("LOG_ARCHIVE_PATTERN")
                .unwrap_or_else(|| format!("{}.{{}}.gz", path)),
            path: path.into(),
        });

        Ok(Self {
            contacts_file,
            http_addr: SocketAddr::new(host, port),
            log_file,
        })
    }
}
