//! Command-line interface for voxpipe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Streaming text-to-speech with strictly ordered playback
#[derive(Parser, Debug)]
#[command(
    name = "voxpipe",
    version = crate::version_string(),
    about = "Streaming text-to-speech with strictly ordered playback"
)]
pub struct Cli {
    /// Subcommand to execute. Without one, voxpipe voices its stdin.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress the transcript echo
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-segment diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Voice ID override
    #[arg(long, value_name = "VOICE")]
    pub voice: Option<String>,

    /// Synthesis model override (e.g., eleven_flash_v2_5)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Finalize the turn after this long without new input [default: 20s]
    #[arg(long, value_name = "DURATION", value_parser = parse_stall_secs)]
    pub stall_timeout: Option<u64>,
}

/// Parse a stall timeout string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`30s`, `5m`), and compound (`1m30s`).
fn parse_stall_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Voice one piece of text and exit
    Say {
        /// Text to speak
        text: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration inspection actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_command() {
        let cli = Cli::try_parse_from(["voxpipe"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.voice.is_none());
        assert!(cli.model.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.stall_timeout.is_none()); // config default applies
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_verbose_counts() {
        let cli = Cli::try_parse_from(["voxpipe", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
        let cli = Cli::try_parse_from(["voxpipe", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "voxpipe",
            "--voice",
            "21m00Tcm4TlvDq8ikWAM",
            "--model",
            "eleven_flash_v2_5",
        ])
        .unwrap();
        assert_eq!(cli.voice.as_deref(), Some("21m00Tcm4TlvDq8ikWAM"));
        assert_eq!(cli.model.as_deref(), Some("eleven_flash_v2_5"));
    }

    #[test]
    fn test_parse_say() {
        let cli = Cli::try_parse_from(["voxpipe", "say", "Hello there."]).unwrap();
        match cli.command {
            Some(Commands::Say { text }) => assert_eq!(text, "Hello there."),
            _ => panic!("Expected Say command"),
        }
    }

    #[test]
    fn test_say_requires_text() {
        let result = Cli::try_parse_from(["voxpipe", "say"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::try_parse_from(["voxpipe", "--config", "/path/to/config.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_global_options_after_command() {
        let cli = Cli::try_parse_from(["voxpipe", "say", "hi", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_parse_quiet_short_flag() {
        let cli = Cli::try_parse_from(["voxpipe", "-q"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["voxpipe", "config", "show"]).unwrap();
        match cli.command {
            Some(Commands::Config { action }) => match action {
                ConfigAction::Show => {}
                _ => panic!("Expected Show action"),
            },
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["voxpipe", "config", "path"]).unwrap();
        match cli.command {
            Some(Commands::Config { action }) => match action {
                ConfigAction::Path => {}
                _ => panic!("Expected Path action"),
            },
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["voxpipe", "config", "init"]).unwrap();
        match cli.command {
            Some(Commands::Config { action }) => match action {
                ConfigAction::Init { force } => assert!(!force),
                _ => panic!("Expected Init action"),
            },
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_parse_config_init_force() {
        let cli = Cli::try_parse_from(["voxpipe", "config", "init", "--force"]).unwrap();
        match cli.command {
            Some(Commands::Config {
                action: ConfigAction::Init { force },
            }) => assert!(force),
            _ => panic!("Expected Init action"),
        }
    }

    #[test]
    fn test_config_requires_subcommand() {
        let result = Cli::try_parse_from(["voxpipe", "config"]);
        let err = result.unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["voxpipe", "completions", "bash"]).unwrap();
        match cli.command {
            Some(Commands::Completions { shell }) => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_invalid_command_returns_error() {
        let result = Cli::try_parse_from(["voxpipe", "invalid"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_help_flag() {
        let result = Cli::try_parse_from(["voxpipe", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["voxpipe", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    // ── Stall timeout parsing tests ──────────────────────────────────────

    #[test]
    fn test_parse_stall_secs_bare_number() {
        assert_eq!(parse_stall_secs("10").unwrap(), 10);
        assert_eq!(parse_stall_secs("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_stall_secs_with_units() {
        assert_eq!(parse_stall_secs("20s").unwrap(), 20);
        assert_eq!(parse_stall_secs("1m").unwrap(), 60);
        assert_eq!(parse_stall_secs("1m30s").unwrap(), 90);
    }

    #[test]
    fn test_parse_stall_secs_invalid() {
        assert!(parse_stall_secs("abc").is_err());
        assert!(parse_stall_secs("10x").is_err());
        assert!(parse_stall_secs("-5").is_err());
    }

    #[test]
    fn test_stall_timeout_cli_arg() {
        let cli = Cli::try_parse_from(["voxpipe", "--stall-timeout", "45s"]).unwrap();
        assert_eq!(cli.stall_timeout, Some(45));
    }
}
