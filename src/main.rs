//! Helm CLI binary entry point.

use helm::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse_args();

    let filter = if cli.verbose { "helm=debug" } else { "helm=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("HELM_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Extract(args) => helm::cli::structured::handle_extract(args),
        Commands::Prompt(args) => helm::cli::structured::handle_prompt(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
