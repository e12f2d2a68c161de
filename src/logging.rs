//! Process-wide logging bootstrap.
//!
//! Logs go to stderr so table output on stdout stays clean for pipes.
//! Initialization happens at most once; later calls with the same level are
//! no-ops and a different level is rejected.

use flexi_logger::{Logger, LoggerHandle};
use log::info;
use once_cell::sync::OnceCell;

use crate::error::{BudgetError, Result};

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    _logger: LoggerHandle,
}

/// Level used when neither `--log-level` nor settings name one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

pub fn init_logging(level: &str) -> Result<()> {
    let level = normalize_level(level)?;

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState> {
        let logger = Logger::try_with_env_or_str(level)
            .map_err(|e| BudgetError::Logging(format!("invalid log level `{level}`: {e}")))?
            .log_to_stderr()
            .format(flexi_logger::default_format)
            .start()
            .map_err(|e| BudgetError::Logging(format!("failed to start logger: {e}")))?;
        info!(
            "event=app_start module=logging status=ok level={level} version={}",
            env!("CARGO_PKG_VERSION")
        );
        Ok(LoggingState {
            level,
            _logger: logger,
        })
    })?;

    if state.level != level {
        return Err(BudgetError::Logging(format!(
            "logging already initialized with level `{}`; refusing to switch to `{level}`",
            state.level
        )));
    }
    Ok(())
}

#[cfg(test)]
fn logging_level() -> Option<&'static str> {
    LOGGING_STATE.get().map(|s| s.level)
}

fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(BudgetError::Logging(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error|off"
        ))),
    }
}
