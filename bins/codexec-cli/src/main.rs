mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codexec-cli")]
#[command(about = "Codexec CLI - Run JVM snippets locally and check the toolchain", long_about = None)]
struct Cli {
    /// Executor config file (defaults to config/codexec.json plus environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a snippet, printing its response value
    Run {
        /// Source file holding the snippet
        #[arg(short, long)]
        file: PathBuf,

        /// Language tag (java, kotlin); inferred from the file extension when omitted
        #[arg(short, long)]
        language: Option<String>,

        /// Print the tagged outcome instead of the flat response value
        #[arg(long, default_value = "false")]
        tagged: bool,
    },

    /// Check that java, javac and kotlinc can be launched
    Doctor,

    /// Write a default config/codexec.json
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            language,
            tagged,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::run_file(config, &file, language.as_deref(), tagged).await?;
        }
        Commands::Doctor => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::doctor(&config)?;
        }
        Commands::Init { path } => {
            commands::init_project(&path)?;
        }
    }

    Ok(())
}
