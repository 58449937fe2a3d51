use anyhow::Result;
use borg_summary::{
    cli::{self, Context},
    config::Config,
    format::OutputFormat,
    state::SummaryDatabase,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "borg-summary")]
#[command(about = "Summarize and monitor borgbackup repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, global = true, env = "BORG_SUMMARY_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database holding backup info
    #[arg(long, global = true, env = "BORG_SUMMARY_DB")]
    database: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the database from borg (skips repositories locked by borg)
    Update {
        /// Root directory of a set of borg repositories (<pool>/<host>/<repo>)
        #[arg(long, conflicts_with = "repo")]
        pool: Option<PathBuf>,

        /// A single borg repository
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Only update repositories whose data is older than refresh_after_minutes
        #[arg(long)]
        auto: bool,

        /// Number of repositories updated concurrently
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Warn about repositories without a recent backup
    Check {
        /// Root directory of a set of borg repositories
        #[arg(long, conflicts_with = "repo")]
        pool: Option<PathBuf>,

        /// A single borg repository
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Warn when the newest backup is older than this many hours
        #[arg(long)]
        hours: Option<u64>,
    },

    /// Summary of all repositories followed by the detail of each one
    Summary {
        /// Root directory of a set of borg repositories
        #[arg(long)]
        pool: Option<PathBuf>,

        /// Only print the summary table
        #[arg(long)]
        brief: bool,
    },

    /// Every backup of one repository
    Detail {
        /// Path to a borg repository
        repo: PathBuf,
    },

    /// Backups that ran at the same time
    Overlaps {
        /// Number of days to look back
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Start times of backups per day
    StartTimes {
        /// Number of days to show
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Tarball snapshots of the newest archive
    Tarball {
        #[command(subcommand)]
        command: TarballCommands,
    },

    /// Remove a repository from the database
    Forget {
        /// Path to the repository
        repo: PathBuf,
    },
}

#[derive(Subcommand)]
enum TarballCommands {
    /// Export the newest archive of each repository with `borg export-tar`
    Export {
        /// Root directory of a set of borg repositories
        #[arg(long, conflicts_with = "repo")]
        pool: Option<PathBuf>,

        /// A single borg repository
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Directory receiving the tarballs
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Tarballs kept per repository (0 keeps all)
        #[arg(long)]
        keep: Option<usize>,
    },

    /// List exported tarballs
    List {
        /// Directory holding the tarballs
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Read every tarball and count its entries
        #[arg(long)]
        inspect: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for reports
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = Some(database);
    }

    let db_path = config.database_path()?;
    tracing::debug!(path = %db_path.display(), "Opening summary database");
    let db = SummaryDatabase::new(&db_path)?;

    let ctx = Context::new(config, db, cli.format);

    // Execute command
    match cli.command {
        Commands::Update {
            pool,
            repo,
            auto,
            jobs,
        } => {
            cli::update::execute(&ctx, pool.as_deref(), repo.as_deref(), auto, jobs).await?;
        }
        Commands::Check { pool, repo, hours } => {
            let warnings = cli::check::execute(&ctx, pool.as_deref(), repo.as_deref(), hours)?;
            if warnings > 0 {
                std::process::exit(1);
            }
        }
        Commands::Summary { pool, brief } => {
            cli::summary::execute(&ctx, pool.as_deref(), brief)?;
        }
        Commands::Detail { repo } => {
            cli::detail::execute(&ctx, &repo)?;
        }
        Commands::Overlaps { days } => {
            cli::overlaps::execute(&ctx, days)?;
        }
        Commands::StartTimes { days } => {
            cli::start_times::execute(&ctx, days)?;
        }
        Commands::Tarball { command } => match command {
            TarballCommands::Export {
                pool,
                repo,
                dir,
                keep,
            } => {
                cli::tarball::export(&ctx, pool.as_deref(), repo.as_deref(), dir.as_deref(), keep)
                    .await?;
            }
            TarballCommands::List { dir, inspect } => {
                cli::tarball::list(&ctx, dir.as_deref(), inspect)?;
            }
        },
        Commands::Forget { repo } => {
            cli::forget::execute(&ctx, &repo)?;
        }
    }

    Ok(())
}
