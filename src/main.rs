//! Model Connectivity Tester - Main CLI Application

use clap::Parser;
use futures::FutureExt;
use model_connectivity_tester::{
    app::{install_panic_hook, App},
    cli::Cli,
    config::EnvManager,
    error::{AppError, ErrorReporter, Result},
    PKG_NAME, VERSION,
};
use std::panic::AssertUnwindSafe;
use std::process;

#[tokio::main]
async fn main() {
    install_panic_hook();

    let cli = Cli::parse();

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return;
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);
    match AssertUnwindSafe(run_application(cli)).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            reporter.report_error(&e);
            print_error_suggestions(&e);
            process::exit(e.exit_code());
        }
        Err(_) => process::exit(AppError::internal("panic").exit_code()),
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{} v{}", PKG_NAME, VERSION);
        eprintln!("Debug mode enabled");
    }

    let app = App::new(cli)?;
    app.run().await?;

    // Per-model failures are results, not errors.
    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Set the provider with --base-url or PROVIDER_BASE_URL");
            eprintln!("  - List models with --model / --models or PROVIDER_MODELS");
            eprintln!("  - Run with --env-help to see every supported variable");
        }
        AppError::NotFound(_) => {
            eprintln!();
            eprintln!("The model passed to --only must be one of the configured models.");
        }
        AppError::Network(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection and proxy settings");
            eprintln!("  - Verify the provider base URL is reachable");
        }
        _ => {}
    }
}
