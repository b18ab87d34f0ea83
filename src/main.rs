use clap::Parser;

use bribery_sim::cli::{check, output, run, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args),
        Commands::Check(args) => check::execute(&args.config),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
