use clap::Parser;
use procdrain::app::{handle_fatal_error, init_logging, AppConfig};
use procdrain::cli::{execute_command, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let live = matches!(&cli.command, Commands::Run(args) if args.live);
    let config = AppConfig::new(cli.verbose).with_live_output(live);
    init_logging(&config);

    match execute_command(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => handle_fatal_error(e, config.verbose),
    }
}
