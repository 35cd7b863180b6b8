//! MangaDex client CLI application.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use mangadex_client::{CancelToken, MangaDex};
use serde::Serialize;
use shared::{ChapterRecord, Config};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List recently updated manga
    Popular {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Search manga by title, or `id:<uuid>`
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show one manga
    Details {
        /// Manga id or `/manga/<id>` reference
        manga: String,
    },
    /// List the visible chapters of a manga
    Chapters {
        /// Manga id or `/manga/<id>` reference
        manga: String,
    },
    /// Resolve the page images of a chapter
    Pages {
        /// Chapter id or `/chapter/<id>` reference
        chapter: String,
    },
    /// Download every page of a chapter
    Download {
        /// Chapter id or `/chapter/<id>` reference
        chapter: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        shared::logging::parse_level(&config.logging.default_level)
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "mangadex-client".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!(config_file = %args.config.display(), "Loaded configuration");

    let source = MangaDex::from_config(&config.mangadex).context("Failed to create MangaDex source")?;

    match args.command {
        Command::Popular { page } => {
            let listing = source.popular(page).await.context("Listing failed")?;
            print_json(&listing)?;
        }
        Command::Search { query, page } => {
            let listing = source.search(page, &query).await.context("Search failed")?;
            print_json(&listing)?;
        }
        Command::Details { manga } => {
            let details = source
                .manga_details(&manga)
                .await
                .context("Details lookup failed")?;
            print_json(&details)?;
        }
        Command::Chapters { manga } => {
            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling chapter listing");
                    on_interrupt.cancel();
                }
            });

            let chapters = source
                .chapter_list(&manga, &cancel)
                .await
                .context("Chapter listing failed")?;
            info!(count = chapters.len(), "Chapters listed");
            let entries: Vec<ChapterEntry> = chapters.iter().map(ChapterEntry::from).collect();
            print_json(&entries)?;
        }
        Command::Pages { chapter } => {
            let pages = source.page_list(&chapter).await.context("Page resolution failed")?;
            print_json(&pages)?;
        }
        Command::Download { chapter, output } => {
            download(&source, &chapter, &output).await?;
        }
    }

    Ok(())
}

async fn download(source: &MangaDex, chapter: &str, output: &Path) -> Result<()> {
    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let pages = source.page_list(chapter).await.context("Page resolution failed")?;
    info!(chapter = %chapter, pages = pages.len(), "Downloading chapter");

    for page in &pages {
        let bytes = source
            .fetch_image(page)
            .await
            .with_context(|| format!("Failed to fetch page {}", page.index))?;

        let extension = Path::new(&page.image_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("img");
        let path = output.join(format!("{:03}.{}", page.index, extension));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(page = page.index, bytes = bytes.len(), path = %path.display(), "Saved page");
    }

    info!(chapter = %chapter, "Download complete");
    Ok(())
}

/// One line of the `chapters` output
#[derive(Serialize)]
struct ChapterEntry<'a> {
    url: String,
    name: String,
    group: Option<&'a str>,
    language: &'a str,
    published: DateTime<Utc>,
}

impl<'a> From<&'a ChapterRecord> for ChapterEntry<'a> {
    fn from(chapter: &'a ChapterRecord) -> Self {
        Self {
            url: chapter.url(),
            name: chapter.display_name(),
            group: chapter.group_name.as_deref(),
            language: &chapter.translated_language,
            published: chapter.publish_at,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
