use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use attendance_scanner::{app, settings::Settings};

#[derive(Parser)]
#[command(name = "attendance-scanner", version, about = "QR code attendance scanner")]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Override the attendance API URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan QR codes from the camera (default)
    Scan,
    /// Run the attendance web service
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print stored attendance records
    List {
        #[arg(long)]
        student: Option<String>,
    },
    /// Print scan totals
    Summary,
    /// Write a settings file with the current values
    InitConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    attendance_scanner::init_logging();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    settings.validate()?;

    match cli.command.unwrap_or(Command::Scan) {
        Command::Scan => {
            app::scan(&settings).await?;
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                settings.server.bind = bind;
            }
            app::serve(&settings).await?;
        }
        Command::List { student } => app::list(&settings, student.as_deref()).await?,
        Command::Summary => app::summary(&settings).await?,
        Command::InitConfig { path } => app::init_config(&settings, &path)?,
    }

    Ok(())
}
