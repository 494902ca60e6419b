//! Server settings, layered from lowest to highest precedence:
//! built-in defaults, an optional `roomdb.toml` in the working directory,
//! `ROOMDB_` environment variables (`__` separates nested keys, so
//! `ROOMDB_SERVER__PORT=9000`), and finally a port given on the command line.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{Result, RoomError};
use crate::grammar::DEFAULT_PARSE_CACHE_CAPACITY;

pub const USAGE: &str = "usage: roomdb [port]";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub parse_cache_capacity: usize,
    /// Default `tracing` filter, used when `RUST_LOG` is unset.
    pub log: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("parse_cache_capacity", DEFAULT_PARSE_CACHE_CAPACITY as i64)?
            .set_default("log", "info")?
            .add_source(File::with_name("roomdb").required(false))
            .add_source(
                Environment::with_prefix("ROOMDB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Applies command line arguments (program name excluded). At most one is
    /// accepted and it must be a port number.
    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        match args.as_slice() {
            [] => Ok(()),
            [port] => {
                self.server.port = port.parse().map_err(|_| RoomError::Config(USAGE.into()))?;
                Ok(())
            }
            _ => Err(RoomError::Config(USAGE.into())),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Settings {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 8080,
            },
            parse_cache_capacity: DEFAULT_PARSE_CACHE_CAPACITY,
            log: "info".into(),
        }
    }

    #[test]
    fn port_argument_overrides() {
        let mut settings = defaults();
        settings.apply_args(vec!["9000".to_string()]).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.address(), "127.0.0.1:9000");
    }

    #[test]
    fn no_arguments_keep_the_port() {
        let mut settings = defaults();
        settings.apply_args(Vec::new()).unwrap();
        assert_eq!(settings, defaults());
    }

    #[test]
    fn bad_arguments_are_usage_errors() {
        let mut settings = defaults();
        let err = settings.apply_args(vec!["eighty".to_string()]).unwrap_err();
        assert!(matches!(err, RoomError::Config(ref msg) if msg == USAGE));
        let err = settings
            .apply_args(vec!["8080".to_string(), "extra".to_string()])
            .unwrap_err();
        assert!(matches!(err, RoomError::Config(_)));
        assert_eq!(settings.server.port, 8080);
    }
}
