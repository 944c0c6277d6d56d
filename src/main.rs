use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

use certmailer::config;
use certmailer::db;
use certmailer::dispatch::{self, MessageTemplate};
use certmailer::import;
use certmailer::keygen::KeyGenerator;
use certmailer::mailer::MailerClient;
use certmailer::render::{certificate_filename, CertificateRenderer, PdfCertificateRenderer};
use certmailer::roster;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import a CSV recipient roster as a new batch
    Import {
        /// Roster file with `name` and `contact_address` columns
        #[arg(long)]
        roster: PathBuf,
    },
    /// Email every participant in a batch their access link and key
    Dispatch {
        #[arg(long)]
        batch: String,
    },
    /// Print a batch's participants
    List {
        #[arg(long)]
        batch: String,
    },
    /// Render one certificate PDF per participant
    Render {
        #[arg(long)]
        batch: String,
        /// Output directory for the PDFs
        #[arg(long, default_value = "certificates")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/certmailer.db", cfg.app.data_dir));
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    match args.command {
        Command::Import { roster: path } => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open roster {}", path.display()))?;
            let rows = roster::read_recipients(file)?;
            let mut keygen = KeyGenerator::new(cfg.app.key_length);
            let outcome = import::import_batch(&pool, &rows, &mut keygen).await?;
            info!(batch_id = %outcome.batch_id, imported = outcome.imported, "import finished");
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Dispatch { batch } => {
            let transport =
                MailerClient::from_config(&cfg).context("mailer.api_base is not a valid URL")?;
            let template = MessageTemplate::from_config(&cfg.message);
            let report = dispatch::dispatch_batch(&pool, &batch, &template, &transport).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List { batch } => {
            let participants = db::list_participants(&pool, &batch).await?;
            println!("{}", serde_json::to_string_pretty(&participants)?);
        }
        Command::Render { batch, out } => {
            let participants = db::list_participants(&pool, &batch).await?;
            std::fs::create_dir_all(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let renderer = PdfCertificateRenderer::default();
            for participant in &participants {
                let bytes = renderer.render(&participant.name)?;
                let path = out.join(certificate_filename(&participant.name));
                std::fs::write(&path, bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(name = %participant.name, path = %path.display(), "rendered certificate");
            }
            println!(
                "rendered {} certificates into {}",
                participants.len(),
                out.display()
            );
        }
    }

    Ok(())
}
