use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use falu::cli::Cli;
use falu::logging::init_logging;
use falu::App;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logging = match init_logging(cli.verbose) {
        Ok(guard) => {
            tracing::debug!("Logging to {}", guard.log_path.display());
            Some(guard)
        }
        Err(e) => {
            eprintln!("Warning: file logging unavailable: {e:#}");
            None
        }
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received");
            interrupt.cancel();
        }
    });

    let result = match App::new(cli) {
        Ok(app) => app.run(cancel).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
