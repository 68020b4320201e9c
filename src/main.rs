use advisorhub_points::Direction;
use anyhow::Result;
use clap::{Parser, Subcommand};

mod cli {
    pub mod points;
    pub mod server;
}

/// advisorhub - points ledger and membership tiers
#[derive(Parser)]
#[command(name = "advisorhub")]
#[command(about = "Points ledger and membership tier accounting", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides config file)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run database migrations
    Migrate,
    /// Drop database if exists and recreate with migrations
    Reset,
    /// Expire every lot due at the given time
    Sweep {
        /// Unix seconds, defaults to now
        #[arg(long)]
        as_of: Option<i64>,
    },
    /// Credit or debit a member's balance by hand
    Adjust {
        #[arg(long)]
        member: String,

        /// credit or debit
        #[arg(long)]
        direction: Direction,

        #[arg(long)]
        amount: i64,

        #[arg(long)]
        reason: String,

        /// Operator id recorded in the audit log
        #[arg(long)]
        actor: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = advisorhub::config::Config::load(cli.config.clone())?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    advisorhub::observability::init_observability(
        "advisorhub",
        &config.observability.log_level,
        config.observability.json,
    )?;

    match cli.command {
        Commands::Serve { host, port } => cli::server::serve(config, host, port).await,
        Commands::Migrate => cli::points::migrate(&config).await,
        Commands::Reset => cli::points::reset(&config).await,
        Commands::Sweep { as_of } => cli::points::sweep(&config, as_of).await,
        Commands::Adjust {
            member,
            direction,
            amount,
            reason,
            actor,
        } => cli::points::adjust(&config, member, direction, amount, reason, actor).await,
    }
}
