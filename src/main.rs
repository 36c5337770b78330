//! copyforge - multilingual marketing-content generation CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use copyforge::cli;
use copyforge::config::load_config;

#[derive(Parser)]
#[command(name = "copyforge", about = "copyforge - AI marketing content engine", version)]
struct Cli {
    /// Path to the config file (default: ~/.copyforge/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available tools and their input fields.
    Tools,
    /// Run a tool and print the generated content.
    Run {
        /// Tool id (see `copyforge tools`).
        tool: String,
        /// Input values as name=value pairs (repeatable).
        #[arg(short, long = "input")]
        inputs: Vec<String>,
        /// Attach an image file (tools that accept one).
        #[arg(long)]
        image: Option<PathBuf>,
        /// Content language: en or ar (default from config).
        #[arg(long)]
        lang: Option<String>,
        /// Stream output as it is generated (grounded tools only).
        #[arg(long)]
        stream: bool,
        /// Output file for generated video (default: video.mp4).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show recent generations for the signed-in user.
    History {
        /// Maximum number of records to show.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,hyper=warn,reqwest=warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Cli::parse();
    let config = load_config(args.config.as_deref());

    match args.command {
        Commands::Tools => {
            cli::cmd_tools();
            Ok(())
        }
        Commands::Run {
            tool,
            inputs,
            image,
            lang,
            stream,
            out,
        } => {
            cli::cmd_run(
                config,
                &tool,
                &inputs,
                image.as_deref(),
                lang.as_deref(),
                stream,
                out.as_deref(),
            )
            .await
        }
        Commands::History { limit } => cli::cmd_history(config, limit),
    }
}
