//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::identification::ReadDeviceIdCode;
use crate::registry::Key;
use crate::tag::Tag;

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Output a timestamped snapshot as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Find command arguments.
#[derive(Debug, Args)]
pub struct FindCommand {
    /// `vendor`, `hardware`, `firmware`, or a custom tag (name, decimal or 0x-hex)
    pub key: Key,

    /// List every custom descriptor carrying the tag, not just the first
    #[arg(short, long)]
    pub all: bool,
}

/// Read command arguments.
#[derive(Debug, Args)]
pub struct ReadCommand {
    /// Custom tag (name, decimal or 0x-hex)
    pub tag: Tag,

    /// Print the raw bytes as hex
    #[arg(short = 'x', long)]
    pub hex: bool,
}

/// Ident command arguments.
#[derive(Debug, Args)]
pub struct IdentCommand {
    /// Which objects to return
    #[arg(long, value_enum, default_value = "regular")]
    pub code: IdentCodeArg,

    /// Return a single object (decimal or 0x-hex id)
    #[arg(short, long, value_parser = parse_object_id, conflicts_with = "code")]
    pub object: Option<u8>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl IdentCommand {
    /// The request these arguments describe.
    #[must_use]
    pub fn request(&self) -> ReadDeviceIdCode {
        match self.object {
            Some(id) => ReadDeviceIdCode::Specific(id),
            None => self.code.into(),
        }
    }
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

/// Read code argument for `ident`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdentCodeArg {
    /// Vendor name, product code and revision
    Basic,
    /// All standard objects
    Regular,
    /// Standard objects plus every custom descriptor
    Extended,
}

impl From<IdentCodeArg> for ReadDeviceIdCode {
    fn from(arg: IdentCodeArg) -> Self {
        match arg {
            IdentCodeArg::Basic => Self::Basic,
            IdentCodeArg::Regular => Self::Regular,
            IdentCodeArg::Extended => Self::Extended,
        }
    }
}

fn parse_object_id(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|_| format!("invalid object id: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_code_conversion() {
        assert_eq!(
            ReadDeviceIdCode::from(IdentCodeArg::Basic),
            ReadDeviceIdCode::Basic
        );
        assert_eq!(
            ReadDeviceIdCode::from(IdentCodeArg::Extended),
            ReadDeviceIdCode::Extended
        );
    }

    #[test]
    fn test_ident_request_prefers_object() {
        let cmd = IdentCommand {
            code: IdentCodeArg::Regular,
            object: Some(0x80),
            json: false,
        };
        assert_eq!(cmd.request(), ReadDeviceIdCode::Specific(0x80));

        let cmd = IdentCommand {
            code: IdentCodeArg::Basic,
            object: None,
            json: false,
        };
        assert_eq!(cmd.request(), ReadDeviceIdCode::Basic);
    }

    #[test]
    fn test_parse_object_id() {
        assert_eq!(parse_object_id("4"), Ok(4));
        assert_eq!(parse_object_id("0x80"), Ok(0x80));
        assert_eq!(parse_object_id("0XfF"), Ok(0xff));
        assert!(parse_object_id("256").is_err());
        assert!(parse_object_id("model").is_err());
    }
}
