//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use coreget_core::Flavor;

/// Resolve and fetch game-server artifacts.
///
/// Coreget lists runtime versions across metadata providers, probes which
/// server flavors exist for a version, enumerates builds, and downloads a
/// chosen build atomically.
#[derive(Parser, Debug)]
#[command(name = "coreget")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Metadata provider to use (default: the first registered one)
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List release runtime versions (union of all providers)
    Versions,

    /// Probe which server flavors exist for a runtime version
    Flavors {
        /// Runtime version, e.g. 1.20.1
        version: String,
    },

    /// List builds for a runtime version and flavor, newest first
    Builds {
        /// Runtime version, e.g. 1.20.1
        version: String,
        /// Flavor: vanilla, forge, fabric, neoforge, liteloader, optifine
        flavor: Flavor,
    },

    /// Resolve a build and download its artifact
    Fetch {
        /// Runtime version, e.g. 1.20.1
        version: String,
        /// Flavor: vanilla, forge, fabric, neoforge, liteloader, optifine
        flavor: Flavor,
        /// Build identifier as printed by `builds`
        build: String,
        /// Destination directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_versions_subcommand_parses() {
        let args = Args::try_parse_from(["coreget", "versions"]).unwrap();
        assert!(matches!(args.command, Command::Versions));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.provider.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["coreget", "-vv", "versions"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_provider_flag() {
        let args = Args::try_parse_from(["coreget", "-p", "mojang", "versions"]).unwrap();
        assert_eq!(args.provider.as_deref(), Some("mojang"));
    }

    #[test]
    fn test_cli_flavors_requires_version() {
        let result = Args::try_parse_from(["coreget", "flavors"]);
        assert!(result.is_err());

        let args = Args::try_parse_from(["coreget", "flavors", "1.20.1"]).unwrap();
        match args.command {
            Command::Flavors { version } => assert_eq!(version, "1.20.1"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_builds_parses_flavor() {
        let args = Args::try_parse_from(["coreget", "builds", "1.20.1", "forge"]).unwrap();
        match args.command {
            Command::Builds { version, flavor } => {
                assert_eq!(version, "1.20.1");
                assert_eq!(flavor, Flavor::Forge);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_builds_rejects_unknown_flavor() {
        let result = Args::try_parse_from(["coreget", "builds", "1.20.1", "bukkit"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_fetch_with_output_dir() {
        let args = Args::try_parse_from([
            "coreget", "fetch", "1.20.1", "forge", "47.1.13", "-o", "/srv/mc",
        ])
        .unwrap();
        match args.command {
            Command::Fetch {
                version,
                flavor,
                build,
                output,
            } => {
                assert_eq!(version, "1.20.1");
                assert_eq!(flavor, Flavor::Forge);
                assert_eq!(build, "47.1.13");
                assert_eq!(output, PathBuf::from("/srv/mc"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_fetch_defaults_output_to_cwd() {
        let args =
            Args::try_parse_from(["coreget", "fetch", "1.20.1", "vanilla", "1.20.1"]).unwrap();
        match args.command {
            Command::Fetch { output, .. } => assert_eq!(output, PathBuf::from(".")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["coreget", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_missing_subcommand_is_an_error() {
        let result = Args::try_parse_from(["coreget"]);
        assert!(result.is_err());
    }
}
