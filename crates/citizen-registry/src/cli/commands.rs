//! CLI command definitions.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;

/// Serve command arguments. Each flag overrides the loaded configuration.
#[derive(Debug, Default, Args)]
pub struct ServeCommand {
    /// Address to bind to
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the database file
    #[arg(short, long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Only serve the national-ID routes under /api
    #[arg(long)]
    pub no_legacy_routes: bool,
}

impl ServeCommand {
    /// Apply these flags on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind = bind.to_string();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(database) = &self.database {
            config.storage.database_path = Some(database.clone());
        }
        if self.no_legacy_routes {
            config.server.legacy_routes = false;
        }
    }
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags_override_config() {
        let mut config = Config::default();
        let cmd = ServeCommand {
            bind: Some("0.0.0.0".parse().unwrap()),
            port: Some(8080),
            database: Some(PathBuf::from("/tmp/x.db")),
            no_legacy_routes: true,
        };
        cmd.apply(&mut config);

        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/x.db"));
        assert!(!config.server.legacy_routes);
    }

    #[test]
    fn test_empty_serve_flags_change_nothing() {
        let mut config = Config::default();
        ServeCommand::default().apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
