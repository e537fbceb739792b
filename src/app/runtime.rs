use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::app::context::AppContext;
use crate::app::terminal;
use crate::cli::{Cli, Command, ConfigCommand};
use crate::{ProcessExit, commands};

pub(crate) async fn run_cookie_backup() -> Result<ProcessExit> {
    let cli = Cli::parse();

    let default_level = terminal::resolve_default_log_level(cli.verbose, cli.quiet);
    terminal::init_tracing(default_level, terminal::is_no_color_requested(cli.no_color));

    let ctx = AppContext::resolve(&cli)?;
    debug!(command = cli.command.name(), "CLI arguments parsed");

    match &cli.command {
        Command::Run => commands::run_daemon_command(&ctx).await?,
        Command::Install => commands::run_install_command(&ctx).await?,
        Command::Export(args) => return commands::run_export_command(&ctx, args).await,
        Command::Config { command } => match command {
            ConfigCommand::Show => commands::run_config_show_command(&ctx).await?,
            ConfigCommand::Set(args) => commands::run_config_set_command(&ctx, args).await?,
        },
        Command::Status => commands::run_status_command(&ctx).await?,
        Command::Decrypt(args) => commands::run_decrypt_command(args).await?,
    }

    Ok(ProcessExit::Success)
}
