use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mockview_core::load_config;
use mockview_provider::create_provider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod chat;

use chat::{run_chat, ChatArgs};

#[derive(Parser)]
#[command(name = "mockview", version, about = "Practice technical interviews in the terminal")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.mockview",
        help = "Config root directory (contains config/mockview.yaml)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run an interview session")]
    Chat {
        #[arg(long, help = "Candidate name")]
        name: Option<String>,
        #[arg(long, help = "Position, e.g. \"Backend Developer\"")]
        position: Option<String>,
        #[arg(long, help = "Target grade: Junior, Middle, Senior or Lead")]
        grade: Option<String>,
        #[arg(long, help = "Short description of the candidate's experience")]
        experience: Option<String>,
        #[arg(long, help = "Review every interviewer reply before it is sent")]
        smart: bool,
        #[arg(long, help = "Where session logs are written (default: <config_root>/sessions)")]
        log_dir: Option<PathBuf>,
    },
    #[command(about = "Validate config files")]
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Expand ~ to home directory
    if cli.config_root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.config_root = PathBuf::from(home).join(
                cli.config_root
                    .strip_prefix("~")
                    .unwrap_or(&cli.config_root),
            );
        }
    }

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mockview.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Validate => {
            let config = load_config(&cli.config_root.join("config"))?;
            create_provider(&config.provider.connection)?;
            println!(
                "Config valid. provider {:?} ({}), smart mode {}, feedback {:?}, retry {}x.",
                config.provider.connection.provider_type,
                config.provider.model,
                if config.interview.smart_mode { "on" } else { "off" },
                config.interview.feedback_format,
                config.retry.max_attempts
            );
        }
        Commands::Chat {
            name,
            position,
            grade,
            experience,
            smart,
            log_dir,
        } => {
            let args = ChatArgs {
                name,
                position,
                grade,
                experience,
                smart,
                log_dir,
            };
            run_chat(&cli.config_root, args).await?;
        }
    }

    Ok(())
}
