pub mod config;
pub mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::{BudgetError, Result};
use crate::models::{BudgetMatrix, ProjectSelection, ViewMode};
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "budget-matrix",
    version,
    about = "Budget execution matrix: planned vs actual spend by project, item and month."
)]
pub struct Cli {
    /// Log level: trace, debug, info, warn, error, off
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Budget payload JSON (`-` for stdin). Defaults to the configured file.
    #[arg(long)]
    pub file: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// View mode: comparative, planned_only, actual_only
    #[arg(long)]
    pub mode: Option<String>,
    /// Restrict to a single project id
    #[arg(long)]
    pub project: Option<i64>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project × budget item rows with planned, actual and variance.
    Matrix {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Monthly totals, January through December.
    Months {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Grand totals for the filtered rows.
    Totals {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Month-by-month detail of one project and budget item.
    Detail {
        #[command(flatten)]
        source: SourceArgs,
        /// Project id
        #[arg(long)]
        project: i64,
        /// Budget item id
        #[arg(long)]
        item: i64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Server-side summary: initial budget, current state, indicators.
    Summary {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Compare reported totals with month sums and server grand totals.
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show or change saved settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print shell completions.
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print current settings and where they are stored.
    Show,
    /// Set the default view mode.
    SetMode {
        /// comparative, planned_only or actual_only
        mode: String,
    },
    /// Set the default payload file.
    SetFile {
        /// Path to a budget payload JSON file
        path: String,
    },
}

pub(crate) fn resolve_payload_path(source: &SourceArgs, settings: &Settings) -> Result<PathBuf> {
    source
        .file
        .clone()
        .or_else(|| settings.payload_path.clone())
        .map(PathBuf::from)
        .ok_or_else(|| {
            BudgetError::Other(
                "no payload file: pass --file or run `budget-matrix config set-file <path>`".into(),
            )
        })
}

pub(crate) fn resolve_mode(mode: Option<&str>, settings: &Settings) -> Result<ViewMode> {
    match mode {
        Some(m) => m.parse(),
        None => settings.view_mode(),
    }
}

/// A project filter must name a project the payload knows about; a known
/// project with no matrix data is fine and simply renders nothing.
pub(crate) fn resolve_selection(
    matrix: &BudgetMatrix,
    project: Option<i64>,
) -> Result<ProjectSelection> {
    if let Some(id) = project {
        if matrix.project(id).is_none() && !matrix.matrix.contains_key(&id) {
            return Err(BudgetError::UnknownProject(id));
        }
    }
    Ok(ProjectSelection::from(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, ProjectMatrix};

    #[test]
    fn test_file_flag_wins_over_settings() {
        let settings = Settings {
            payload_path: Some("/saved.json".into()),
            ..Settings::default()
        };
        let source = SourceArgs {
            file: Some("/flag.json".into()),
        };
        assert_eq!(resolve_payload_path(&source, &settings).unwrap(), PathBuf::from("/flag.json"));
        let from_settings = resolve_payload_path(&SourceArgs::default(), &settings).unwrap();
        assert_eq!(from_settings, PathBuf::from("/saved.json"));
    }

    #[test]
    fn test_missing_payload_path_is_an_error() {
        let err = resolve_payload_path(&SourceArgs::default(), &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("--file"));
    }

    #[test]
    fn test_mode_flag_wins_and_is_validated() {
        let settings = Settings {
            default_view_mode: "actual_only".into(),
            ..Settings::default()
        };
        assert_eq!(resolve_mode(None, &settings).unwrap(), ViewMode::ActualOnly);
        assert_eq!(resolve_mode(Some("planned_only"), &settings).unwrap(), ViewMode::PlannedOnly);
        assert!(matches!(
            resolve_mode(Some("all"), &settings),
            Err(BudgetError::InvalidViewMode(_))
        ));
    }

    #[test]
    fn test_resolve_selection() {
        let mut matrix = BudgetMatrix::default();
        matrix.projects.push(Project { id: 1, name: "Listed".into() });
        matrix.matrix.insert(2, ProjectMatrix::empty(2, "Matrix only"));
        assert_eq!(resolve_selection(&matrix, None).unwrap(), ProjectSelection::All);
        assert_eq!(resolve_selection(&matrix, Some(1)).unwrap(), ProjectSelection::One(1));
        assert_eq!(resolve_selection(&matrix, Some(2)).unwrap(), ProjectSelection::One(2));
        assert!(matches!(resolve_selection(&matrix, Some(9)), Err(BudgetError::UnknownProject(9))));
    }

    #[test]
    fn test_cli_parses_view_flags() {
        let cli = Cli::try_parse_from([
            "budget-matrix", "matrix", "--file", "p.json", "--mode", "actual_only", "--project", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Matrix { view } => {
                assert_eq!(view.source.file.as_deref(), Some("p.json"));
                assert_eq!(view.mode.as_deref(), Some("actual_only"));
                assert_eq!(view.project, Some(3));
                assert!(!view.json);
            }
            _ => panic!("expected matrix command"),
        }
    }
}
