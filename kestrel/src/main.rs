use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use kestrel::{
    EmailWorker, InMemoryQueue, Kestrel, KestrelConfig, SqliteRepositoryProvider, SqliteStorage,
};
use kestrel_core::queue::email::EMAIL_QUEUE;
use tracing_subscriber::EnvFilter;

/// Command line interface for Kestrel
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://kestrel.db")]
    database_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Delete expired refresh tokens and password reset tokens
    Cleanup,
    /// Send a password reset email to an account
    ResetPassword {
        /// Email address of the account
        #[arg(long)]
        email: String,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Before parsing so DATABASE_URL can come from .env
    kestrel::config::load_dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            tracing::info!("Running migrations");
            let storage = SqliteStorage::connect(&cli.database_url)
                .await
                .context("failed to open database")?;
            storage.migrate().await.context("failed to run migrations")?;
            tracing::info!("Migrations complete");
        }
        Commands::Cleanup => {
            let config = KestrelConfig::from_process_env().context("invalid configuration")?;
            let (kestrel, _) = connect(&cli.database_url, &config).await?;
            let removed = kestrel
                .cleanup_expired()
                .await
                .context("failed to clean up expired tokens")?;
            println!("Removed {removed} expired tokens");
        }
        Commands::ResetPassword { email } => {
            let config = KestrelConfig::from_process_env().context("invalid configuration")?;
            let (kestrel, queue) = connect(&cli.database_url, &config).await?;
            let mut receiver = queue.subscribe(EMAIL_QUEUE);

            kestrel
                .request_password_reset(&email)
                .await
                .context("failed to request password reset")?;

            let mailer = config
                .mailer
                .build_transport()
                .context("failed to build mail transport")?;
            let worker = EmailWorker::new(Arc::new(mailer), &config.mailer);

            while let Ok(message) = receiver.try_recv() {
                worker
                    .handle(message)
                    .await
                    .context("failed to deliver password reset email")?;
            }
        }
        Commands::Version => {
            println!("Kestrel v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn connect(
    database_url: &str,
    config: &KestrelConfig,
) -> anyhow::Result<(
    Kestrel<SqliteRepositoryProvider, InMemoryQueue>,
    Arc<InMemoryQueue>,
)> {
    let storage = SqliteStorage::connect(database_url)
        .await
        .context("failed to open database")?;

    let repositories = Arc::new(storage.into_repository_provider());
    let queue = Arc::new(InMemoryQueue::new());
    let kestrel = Kestrel::new(repositories, queue.clone(), config);

    Ok((kestrel, queue))
}
