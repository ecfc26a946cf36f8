//! Command-line interface definition

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Find out which npm dependencies are held back, and by what
#[derive(Parser, Debug)]
#[command(name = "unblock", version, about, long_about = None)]
pub struct Cli {
    /// Project root containing package.json and package-lock.json
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Settings file (defaults to unblock.toml in the project root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify top-level dependencies as safe, blocked or major jumps
    Analyze(AnalyzeArgs),

    /// Show the phased update plan without changing anything
    Preview(PreviewArgs),

    /// Apply updates through the package manager
    Update(UpdateArgs),

    /// Put a backup of package.json and package-lock.json back
    Restore(RestoreArgs),

    /// List or prune backups
    Backups {
        #[command(subcommand)]
        command: BackupsCommand,
    },

    /// Manage unblock.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct AnalyzeArgs {
    /// Ignore devDependencies
    #[arg(long)]
    pub production: bool,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PreviewArgs {
    /// Ignore devDependencies
    #[arg(long)]
    pub production: bool,

    /// Only plan updates that stay within the declared range's major
    #[arg(long)]
    pub safe_only: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Packages to update (all planned packages when omitted)
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Validate and back up, then stop
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the backup
    #[arg(long)]
    pub no_backup: bool,

    /// Run the test command before and after updating
    #[arg(long)]
    pub test: bool,

    /// Ignore devDependencies
    #[arg(long)]
    pub production: bool,

    /// Only apply safe updates
    #[arg(long)]
    pub safe_only: bool,

    /// Also install blocked packages
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    /// Backup directory (the newest backup when omitted)
    pub backup: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum BackupsCommand {
    /// List backups, newest first
    List,

    /// Delete all but the newest backups
    Cleanup {
        /// How many to keep (defaults to update.keep_backups)
        #[arg(long)]
        keep: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default unblock.toml into the project
    Init,

    /// Print the effective settings
    Show,

    /// Print where settings are read from
    Path,

    /// Check the settings file
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["unblock", "analyze", "--json", "-C", "web"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.project, PathBuf::from("web"));
        assert!(matches!(cli.command, Command::Analyze(AnalyzeArgs { production: false })));
    }

    #[test]
    fn test_update_args() {
        let cli = Cli::try_parse_from([
            "unblock", "update", "react", "lodash", "--dry-run", "--force",
        ])
        .unwrap();
        let Command::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.packages, ["react", "lodash"]);
        assert!(args.dry_run && args.force && !args.no_backup);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["unblock", "-v", "-q", "analyze"]).is_err());
    }

    #[test]
    fn test_backups_cleanup_keep() {
        let cli = Cli::try_parse_from(["unblock", "backups", "cleanup", "--keep", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Backups {
                command: BackupsCommand::Cleanup { keep: Some(2) }
            }
        ));
    }
}
