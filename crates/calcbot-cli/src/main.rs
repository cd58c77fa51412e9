//! calcbot CLI: runs the bot and exposes its engines on the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "calcbot",
    version,
    about = "Telegram bot for function analysis and calculus quizzes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot and poll Telegram until Ctrl-C
    Run {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Analyse a function: derivative, critical points, optional plot
    Analyze {
        /// Function of x, e.g. "x**2 - 4*x + 4"
        function: String,

        /// Write the plot as PNG to this path
        #[arg(long)]
        plot: Option<PathBuf>,

        /// Plot width in pixels
        #[arg(long, default_value = "800")]
        width: u32,

        /// Plot height in pixels
        #[arg(long, default_value = "600")]
        height: u32,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a question bank TOML file
    Validate {
        /// Path to the question bank
        #[arg(long)]
        questions: PathBuf,
    },

    /// Create a starter config and question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("calcbot=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config } => commands::run::execute(config).await,
        Commands::Analyze {
            function,
            plot,
            width,
            height,
            json,
        } => commands::analyze::execute(function, plot, width, height, json),
        Commands::Validate { questions } => commands::validate::execute(questions),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
