use std::process;

use clap::Parser;
use formgate_cli::{execute, handle_cli_result, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = formgate_common::init_tracing(cli.log_level()) {
        eprintln!("warning: logging unavailable: {e}");
    }

    let result = execute(&cli).await.map(|output| {
        println!("{}", output.stdout);
        output.exit_code
    });
    process::exit(handle_cli_result(result));
}
