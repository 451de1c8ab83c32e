//! CLI definitions for exact-import.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// exact-import CLI.
#[derive(Debug, Parser)]
#[command(name = "exact-import")]
#[command(about = "Bulk XML import into Exact Online through a driven browser")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (environment variables are applied on top)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Import every pending XML document in a directory
    Upload {
        /// Directory holding the documents
        directory: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Sign in and persist the session without uploading
    Login {
        #[command(flatten)]
        options: RunOptions,
    },
}

impl Commands {
    pub fn options(&self) -> &RunOptions {
        match self {
            Commands::Upload { options, .. } | Commands::Login { options } => options,
        }
    }
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct RunOptions {
    /// One-time code for the second-factor challenge
    #[arg(long, value_name = "CODE")]
    pub otp: Option<String>,

    /// Directory for the browser profile, session cache, screenshots and logs
    #[arg(long, value_name = "DIR")]
    pub tmp_dir: PathBuf,

    /// Run Chrome without a window
    #[arg(long, env = "HEADLESS", value_parser = clap::builder::FalseyValueParser::new())]
    pub headless: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_command() {
        let cli = Cli::try_parse_from([
            "exact-import",
            "--config",
            "exact.toml",
            "upload",
            "/data/exports",
            "--tmp-dir",
            "/tmp/exact",
            "--otp",
            "123456",
            "--headless",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("exact.toml")));
        match &cli.command {
            Commands::Upload { directory, options } => {
                assert_eq!(directory, &PathBuf::from("/data/exports"));
                assert_eq!(options.otp.as_deref(), Some("123456"));
                assert_eq!(options.tmp_dir, PathBuf::from("/tmp/exact"));
                assert!(options.headless);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_login_command_with_trailing_global_config() {
        let cli = Cli::try_parse_from(["exact-import", "login", "--tmp-dir", "/tmp/exact", "-c", "exact.toml"]).unwrap();

        assert!(matches!(cli.command, Commands::Login { .. }));
        assert_eq!(cli.command.options().tmp_dir, PathBuf::from("/tmp/exact"));
        assert_eq!(cli.command.options().otp, None);
        assert_eq!(cli.config, Some(PathBuf::from("exact.toml")));
    }

    #[test]
    fn test_tmp_dir_is_required() {
        assert!(Cli::try_parse_from(["exact-import", "upload", "/data/exports"]).is_err());
        assert!(Cli::try_parse_from(["exact-import", "login"]).is_err());
    }

    #[test]
    fn test_upload_needs_directory() {
        assert!(Cli::try_parse_from(["exact-import", "upload", "--tmp-dir", "/tmp/exact"]).is_err());
    }
}
