use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use voxpipe::app::{run_pipe_command, run_say_command};
use voxpipe::cli::{Cli, Commands, ConfigAction};
use voxpipe::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            if std::io::stdin().is_terminal() {
                eprintln!("Reading from terminal; type text and press Ctrl-D to finish.");
            }
            let outcome = run_pipe_command(
                config,
                cli.voice,
                cli.model,
                cli.stall_timeout,
                cli.quiet,
                cli.verbose,
            )
            .await?;
            // Exit without waiting on the stdin reader; its blocking read
            // cannot be cancelled and would hold the runtime open if the
            // producer stalls without closing the pipe.
            // 130 = interrupted, matching the shell convention for SIGINT.
            std::process::exit(if outcome.aborted { 130 } else { 0 });
        }
        Some(Commands::Say { text }) => {
            let config = load_config(cli.config.as_deref())?;
            run_say_command(config, cli.voice, cli.model, text, cli.quiet, cli.verbose).await?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "voxpipe",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` path must exist; the default path is allowed to
/// be missing. Environment variable overrides are applied either way.
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        let default_path = Config::default_path();
        Config::load_or_default(&default_path)
    };

    Ok(config.with_env_overrides())
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&std::path::Path>,
) -> Result<()> {
    let config_path = custom_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Show => {
            let mut config = Config::load_or_default(&config_path).with_env_overrides();
            // Never echo credentials back to the terminal.
            if config.synthesis.api_key.is_some() {
                config.synthesis.api_key = Some("<redacted>".to_string());
            }
            match toml::to_string_pretty(&config) {
                Ok(toml) => print!("{}", toml),
                Err(e) => {
                    eprintln!("{}", format!("Error: {}", e).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Init { force } => {
            Config::write_template(&config_path, force)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}
