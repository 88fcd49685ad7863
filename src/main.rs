//! Thin process entry point: initializes logging, parses arguments,
//! and hands off to `cli::run`. `#[tokio::main]` shape and
//! tracing-subscriber-before-parsing order follow `examples/
//! jpmacdonald-apl/crates/apl-cli/src/main.rs`.

use clap::Parser;
use mbuild::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let code = match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            2
        }
    };
    std::process::exit(code);
}
