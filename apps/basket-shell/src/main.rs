//! # Basket Shell Entry Point
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Initialize tracing (logging)
//! 3. Load configuration
//! 4. Open the store and bootstrap the cart
//! 5. Read commands until `quit` or EOF

use std::process::ExitCode;

use basket_shell_lib::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    // The actual setup is in lib.rs for better testability
    match basket_shell_lib::run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("basket-shell: {}", e);
            ExitCode::FAILURE
        }
    }
}
