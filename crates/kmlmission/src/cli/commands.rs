//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::kml::CoordinatePolicy;

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// KML file to import
    pub file: PathBuf,

    /// Mission name (defaults to the configured default name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Override the configured coordinate policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Mission identifier
    pub id: i64,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Maximum number of missions to list
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Decode command arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// KML file to decode
    pub file: PathBuf,

    /// Override the configured coordinate policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
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
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Coordinate policy argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Skip malformed coordinate tokens
    Lenient,
    /// Reject documents with malformed coordinate tokens
    Strict,
}

impl From<PolicyArg> for CoordinatePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Lenient => Self::Lenient,
            PolicyArg::Strict => Self::Strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_arg_conversion() {
        assert_eq!(
            CoordinatePolicy::from(PolicyArg::Lenient),
            CoordinatePolicy::Lenient
        );
        assert_eq!(
            CoordinatePolicy::from(PolicyArg::Strict),
            CoordinatePolicy::Strict
        );
    }

    #[test]
    fn test_import_command_debug() {
        let cmd = ImportCommand {
            file: PathBuf::from("field.kml"),
            name: Some("North".to_string()),
            policy: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("field.kml"));
        assert!(debug_str.contains("North"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
