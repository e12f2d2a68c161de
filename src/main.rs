use clap::{CommandFactory, Parser};

use budget_matrix::cli::{self, Cli, Commands, ConfigCommands};
use budget_matrix::{logging, settings};

fn main() {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .or_else(|| settings::load_settings().log_level)
        .unwrap_or_else(|| logging::DEFAULT_LOG_LEVEL.to_string());
    if let Err(e) = logging::init_logging(&level) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Matrix { view } => cli::report::matrix(&view),
        Commands::Months { view } => cli::report::months(&view),
        Commands::Totals { view } => cli::report::totals(&view),
        Commands::Detail {
            source,
            project,
            item,
            json,
        } => cli::report::detail(&source, project, item, json),
        Commands::Summary { source } => cli::report::summary(&source),
        Commands::Check { source } => cli::report::check(&source),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::SetMode { mode } => cli::config::set_mode(&mode),
            ConfigCommands::SetFile { path } => cli::config::set_file(&path),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "budget-matrix", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        log::debug!("event=command_failed module=main status=error error={e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
