use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod util;

use commands::score::ScoreArgs;
use commands::take::TakeArgs;

#[derive(Parser)]
#[command(
    name = "melvis",
    version,
    about = "Melvis CLI: mental-health self-assessment from the terminal"
)]
struct Cli {
    /// JSON question bank to use instead of the built-in one
    #[arg(long, global = true, env = "MELVIS_QUESTION_BANK")]
    bank: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the question bank as JSON
    Questions,
    /// Score an answer set and print the result as JSON
    Score(ScoreArgs),
    /// Take the assessment interactively
    Take(TakeArgs),
}

fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let bank = util::load_bank(cli.bank.as_deref());

    let code = match cli.command {
        Commands::Questions => commands::questions::run(&bank),
        Commands::Score(args) => commands::score::run(&bank, args),
        Commands::Take(args) => commands::take::run(bank, args),
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bank_flag_is_global() {
        let cli = Cli::try_parse_from(["melvis", "questions", "--bank", "bank.json"]).unwrap();
        assert_eq!(cli.bank, Some(PathBuf::from("bank.json")));
    }
}
