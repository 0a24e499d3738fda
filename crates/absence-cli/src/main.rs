use std::path::PathBuf;

use absence_cli::{cmd_create_admin, cmd_init, cmd_seed_demo, cmd_users, AdminAccount};
use absence_store::Store;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "absence", about = "Auto-Absence administration CLI")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "ABSENCE_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Create an admin account if it does not exist yet
    CreateAdmin {
        #[arg(long, default_value = "admin@example.com")]
        email: String,
        #[arg(long, default_value = "admin123")]
        password: String,
        #[arg(long, default_value = "Admin")]
        first_name: String,
        #[arg(long, default_value = "User")]
        last_name: String,
    },
    /// Populate a demo group with a teacher, students and one session
    SeedDemo,
    /// List user accounts
    Users,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = cli
        .db
        .unwrap_or_else(|| absence_store::default_db_path(|key| std::env::var(key).ok()));
    let store = Store::open(&db)
        .await
        .with_context(|| format!("opening database {}", db.display()))?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Init => cmd_init(&store, &db, &mut out).await,
        Commands::CreateAdmin {
            email,
            password,
            first_name,
            last_name,
        } => {
            let account = AdminAccount {
                email,
                password,
                first_name,
                last_name,
            };
            cmd_create_admin(&store, account, &mut out).await
        }
        Commands::SeedDemo => cmd_seed_demo(&store, &mut out).await,
        Commands::Users => cmd_users(&store, &mut out).await,
    }
}
