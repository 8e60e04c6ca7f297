use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// packset - switch resource pack features on and off
#[derive(Parser)]
#[command(name = "packset")]
#[command(about = "Apply descriptor-driven feature choices to a resource pack folder or zip archive")]
#[command(version)]
pub struct Cli {
    /// Verbose output (debug-level logging). RUST_LOG overrides this.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the root descriptor and every sub-descriptor it references
    Validate {
        /// Pack folder or .zip archive
        pack: PathBuf,
    },
    /// List features grouped by category with their current values
    Show {
        /// Pack folder or .zip archive
        pack: PathBuf,
    },
    /// Apply chosen feature values to a pack
    Apply {
        /// Pack folder or .zip archive
        pack: PathBuf,

        /// Feature value as NAME=VALUE (repeatable); true/false for bool features
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// JSON file of feature values; --set entries override it
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,

        /// Show the renames that would happen without changing the pack.
        ///
        /// Archives are still extracted to read them but never repacked.
        #[arg(long)]
        dry_run: bool,
    },
    /// Check on-disk feature state against the saved configuration
    Status {
        /// Pack folder or .zip archive
        pack: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["packset"]).is_err());
    }

    #[test]
    fn test_cli_validate_command() {
        let cli = Cli::try_parse_from(["packset", "validate", "/packs/Faithful"]).unwrap();
        match cli.command {
            Commands::Validate { pack } => {
                assert_eq!(pack.to_str().unwrap(), "/packs/Faithful");
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_cli_apply_with_values() {
        let cli = Cli::try_parse_from([
            "packset",
            "apply",
            "pack.zip",
            "--set",
            "HD Font=true",
            "-s",
            "Shadows=hard",
            "--values",
            "choices.json",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Apply {
                pack,
                set,
                values,
                dry_run,
            } => {
                assert_eq!(pack.to_str().unwrap(), "pack.zip");
                assert_eq!(set, vec!["HD Font=true", "Shadows=hard"]);
                assert_eq!(values.unwrap().to_str().unwrap(), "choices.json");
                assert!(dry_run);
            }
            _ => panic!("Expected Apply command"),
        }
    }

    #[test]
    fn test_cli_verbose_is_global() {
        let cli = Cli::try_parse_from(["packset", "status", "pack", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status { .. }));
    }

    #[test]
    fn test_cli_show_command() {
        let cli = Cli::try_parse_from(["packset", "show", "pack"]).unwrap();
        assert!(matches!(cli.command, Commands::Show { .. }));
        assert!(!cli.verbose);
    }
}
