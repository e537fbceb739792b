//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Scheduled and on-demand cookie backups.
///
/// Cookie Backup exports cookies for configured sites to JSON files, on a
/// schedule or on demand, optionally encrypted with a password.
#[derive(Parser, Debug)]
#[command(name = "cookie-backup")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory holding settings.json [env: COOKIE_BACKUP_CONFIG_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Root directory exports are saved under [env: COOKIE_BACKUP_DOWNLOADS_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Netscape cookies.txt or JSON cookie export to read cookies from [env: COOKIE_BACKUP_COOKIES_FILE]
    #[arg(long, global = true, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Arm the schedule and run scheduled exports until interrupted
    Run,
    /// First-run setup: arm the schedule from current settings
    Install,
    /// Export cookies now
    Export(ExportArgs),
    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show last and next backup
    Status,
    /// Decrypt an encrypted export
    Decrypt(DecryptArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Install => "install",
            Self::Export(_) => "export",
            Self::Config { .. } => "config",
            Self::Status => "status",
            Self::Decrypt(_) => "decrypt",
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Site to export (repeatable); defaults to the configured sites
    #[arg(short, long = "site", value_name = "DOMAIN")]
    pub sites: Vec<String>,

    /// Export cookies for every domain
    #[arg(long, conflicts_with = "sites")]
    pub all: bool,

    /// Encrypt the export (password from --password, COOKIE_BACKUP_PASSWORD, or settings)
    #[arg(long)]
    pub encrypt: bool,

    /// Encryption password (implies --encrypt)
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print effective settings (password redacted)
    Show,
    /// Update settings and re-arm the schedule
    Set(ConfigSetArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntervalArg {
    Day,
    Week,
    Month,
    Custom,
    Off,
}

impl IntervalArg {
    pub fn selector(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Custom => "custom",
            Self::Off => "off",
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigSetArgs {
    /// Backup interval
    #[arg(long, value_enum)]
    pub interval: Option<IntervalArg>,

    /// Days between backups when --interval custom
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=3650))]
    pub custom_days: Option<i64>,

    /// Comma-separated sites to back up ("<all>" for every domain)
    #[arg(long)]
    pub sites: Option<String>,

    /// Sub-folder under the downloads directory
    #[arg(long)]
    pub location: Option<String>,

    /// Enable or disable encryption
    #[arg(long, value_name = "BOOL")]
    pub encrypt: Option<bool>,

    /// Encryption password
    #[arg(long)]
    pub password: Option<String>,
}

impl ConfigSetArgs {
    pub fn is_empty(&self) -> bool {
        self.interval.is_none()
            && self.custom_days.is_none()
            && self.sites.is_none()
            && self.location.is_none()
            && self.encrypt.is_none()
            && self.password.is_none()
    }
}

#[derive(Args, Debug, Clone)]
pub struct DecryptArgs {
    /// Encrypted export file
    pub input: PathBuf,

    /// Password used for the export [env: COOKIE_BACKUP_PASSWORD]
    #[arg(long)]
    pub password: Option<String>,

    /// Write the decrypted JSON here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_status_parses_with_defaults() {
        let cli = Cli::try_parse_from(["cookie-backup", "status"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.config_dir.is_none());
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = Cli::try_parse_from(["cookie-backup", "-v", "status"]).unwrap();
        assert_eq!(cli.verbose, 1);

        let cli = Cli::try_parse_from(["cookie-backup", "status", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["cookie-backup"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Cli::try_parse_from(["cookie-backup", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_export_repeated_sites() {
        let cli = Cli::try_parse_from([
            "cookie-backup",
            "export",
            "--site",
            "a.com",
            "-s",
            "b.com",
        ])
        .unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.sites, vec!["a.com".to_string(), "b.com".to_string()]);
        assert!(!args.all);
    }

    #[test]
    fn test_cli_export_all_conflicts_with_sites() {
        let result = Cli::try_parse_from(["cookie-backup", "export", "--all", "--site", "a.com"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_cli_config_set_parses_values() {
        let cli = Cli::try_parse_from([
            "cookie-backup",
            "config",
            "set",
            "--interval",
            "custom",
            "--custom-days",
            "3",
            "--encrypt",
            "true",
        ])
        .unwrap();
        let Command::Config {
            command: ConfigCommand::Set(args),
        } = cli.command
        else {
            panic!("expected config set");
        };
        assert_eq!(args.interval, Some(IntervalArg::Custom));
        assert_eq!(args.custom_days, Some(3));
        assert_eq!(args.encrypt, Some(true));
        assert!(!args.is_empty());
    }

    #[test]
    fn test_cli_config_set_rejects_zero_custom_days() {
        let result = Cli::try_parse_from(["cookie-backup", "config", "set", "--custom-days", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_global_dirs_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cookie-backup",
            "status",
            "--config-dir",
            "/tmp/cfg",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cfg")));
    }
}
