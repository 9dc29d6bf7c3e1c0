use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use mediashare_core::{
    validation::content_type_for_extension, Config, MediaRecord, MediaType, NotificationBus,
    TypeFilter,
};
use mediashare_db::{MediaRepository, PostgresBackend};
use mediashare_services::{DeletionCoordinator, GalleryReader, UploadService};
use mediashare_storage::{create_blob_store, BlobStore, ProgressFn};

#[derive(Parser, Debug)]
#[command(name = "mediashare")]
#[command(about = "Media gallery over blob storage and a metadata index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List media, preferring the metadata index and falling back to storage
    List {
        /// Media type filter: image, audio, video, or all
        #[arg(long, default_value = "all")]
        media_type: String,

        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Upload a file to blob storage and index it
    Upload {
        /// Path of the file to upload
        path: PathBuf,

        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete a blob and its index record
    Delete {
        /// Blob name, typically <timestamp>-<file name>
        blob_name: String,

        /// Container holding the blob; derived from --media-type when omitted
        #[arg(long)]
        container: Option<String>,

        /// Media type hint: image, audio, or video
        #[arg(long)]
        media_type: Option<String>,
    },
}

struct App {
    reader: GalleryReader,
    uploads: UploadService,
    deletions: DeletionCoordinator,
}

async fn build_app(bus: NotificationBus) -> Result<App> {
    let config = Config::from_env()?;
    config.validate().map_err(|e| anyhow!(e.to_string()))?;

    let blobs: Arc<dyn BlobStore> = create_blob_store(&config)
        .await
        .map_err(|e| anyhow!("failed to initialize blob storage: {e}"))?;

    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow!("DATABASE_URL is not set"))?;
    let backend = PostgresBackend::connect(database_url)
        .await
        .map_err(|e| anyhow!("failed to connect to the metadata store: {e}"))?;
    backend
        .ensure_schema()
        .await
        .map_err(|e| anyhow!("failed to prepare the metadata store: {e}"))?;

    let repository = Arc::new(MediaRepository::new(Arc::new(backend)));

    Ok(App {
        reader: GalleryReader::new(repository.clone(), blobs.clone()),
        uploads: UploadService::new(
            repository.clone(),
            blobs.clone(),
            config.upload_policy(),
            bus.clone(),
        ),
        deletions: DeletionCoordinator::new(repository, blobs, bus),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Drain service notifications to stderr as they arrive.
    let bus = NotificationBus::default();
    let mut notifications = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(note) = notifications.recv().await {
            eprintln!("[{}] {}", note.level, note.message);
        }
    });

    let app = build_app(bus).await?;

    match cli.command {
        Command::List { media_type, format } => {
            let filter = TypeFilter::parse(&media_type);
            let records = app
                .reader
                .list(&filter)
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            print_records(&records, &format)?;
        }

        Command::Upload { path, content_type } => {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("invalid file path: {}", path.display()))?
                .to_string();

            let content_type = match content_type {
                Some(ct) => ct,
                None => {
                    let extension = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .ok_or_else(|| anyhow!("cannot guess a MIME type without an extension; pass --content-type"))?;
                    content_type_for_extension(extension)
                        .ok_or_else(|| anyhow!("unrecognized extension '{extension}'; pass --content-type"))?
                        .to_string()
                }
            };

            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            let progress: ProgressFn = Arc::new(|pct| eprintln!("  upload {pct}%"));
            let record = app
                .uploads
                .upload(
                    mediashare_services::UploadRequest {
                        file_name,
                        content_type,
                        data: Bytes::from(data),
                    },
                    Some(progress),
                )
                .await
                .map_err(|e| anyhow!(e.client_message()))?;

            println!("uploaded {}", record.blob_name.as_deref().unwrap_or(&record.id));
            if let Some(url) = &record.blob_url {
                println!("url: {url}");
            }
        }

        Command::Delete {
            blob_name,
            container,
            media_type,
        } => {
            let hint = media_type.as_deref().and_then(MediaType::normalize);
            let container = container
                .or_else(|| hint.map(|mt| mt.container_name().to_string()))
                .ok_or_else(|| anyhow!("pass --container or --media-type so the blob can be located"))?;

            let report = app
                .deletions
                .delete(&blob_name, &container, hint)
                .await
                .map_err(|e| anyhow!(e.client_message()))?;
            println!("{}", report.message());

            // Re-fetch so the caller sees whatever state was actually reached.
            let filter = hint.map(TypeFilter::Only).unwrap_or(TypeFilter::All);
            let records = app
                .reader
                .list(&filter)
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            println!("{} file(s) remaining for filter '{}'", records.len(), filter);

            if !report.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_records(records: &[MediaRecord], format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(records)?),
        "table" => {
            if records.is_empty() {
                println!("no media found");
                return Ok(());
            }
            println!(
                "{:<8} {:<40} {:<26} url",
                "type", "blob name", "uploaded"
            );
            for record in records {
                let media_type = record
                    .normalized_type()
                    .map(|mt| mt.as_str())
                    .unwrap_or("?");
                let blob_name = record
                    .blob_name
                    .as_deref()
                    .or(record.name.as_deref())
                    .unwrap_or(&record.id);
                let uploaded = record
                    .upload_date
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default();
                let url = record.blob_url.as_deref().unwrap_or("");
                println!("{:<8} {:<40} {:<26} {}", media_type, blob_name, uploaded, url);
            }
        }
        other => return Err(anyhow!("unknown format '{other}'; use table or json")),
    }
    Ok(())
}
