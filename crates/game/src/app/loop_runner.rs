use std::process::ExitCode;

use engine::{run_app, AppError};
use tracing::error;

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_app(app.config, app.scene) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_startup_failure(&err),
    }
}

pub(crate) fn report_startup_failure(err: &AppError) -> ExitCode {
    error!(error = %err, "startup_failed");
    ExitCode::FAILURE
}
