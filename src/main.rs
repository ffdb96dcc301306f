use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use asciiforge::config::{self, AppConfig};
use asciiforge::constants::DEFAULT_DOCUMENT_TITLE;
use asciiforge::document::{Document, DocumentStore, FileStore};
use asciiforge::error::{DocumentError, EntityKind, Result};
use asciiforge::{logging, paths};

#[derive(Debug, Parser)]
#[command(
    name = "asciiforge",
    about = "Create, draw on and print layered ASCII documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create an empty document and store it under KEY.
    New {
        key: String,
        /// Document title
        title: Option<String>,
    },

    /// Print the visible layers of a stored document.
    Render { key: String },

    /// Write TEXT onto the active layer at world position X,Y. `\n` starts a new row.
    Write {
        key: String,
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        text: String,
    },
}

fn load(store: &dyn DocumentStore, key: &str) -> Result<Document> {
    Document::load_from(store, key).ok_or_else(|| DocumentError::NotFound {
        kind: EntityKind::Document,
        id: key.to_string(),
    })
}

/// Composite of the visible layers, cropped to the drawn characters
fn render(doc: &Document) -> String {
    let Some((x, y, width, height)) = doc.layers().occupied_bounds() else {
        return String::new();
    };
    let block = doc.layers().read_combined_region(x, y, width, height);
    let lines: Vec<&str> = block.split('\n').map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let last = lines.iter().rposition(|l| !l.is_empty()).map_or(first, |i| i + 1);
    let lines = &lines[first..last];

    // Leading spaces, in characters, shared by every non-blank row
    let indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.chars().take_while(|c| *c == ' ').count())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.chars().skip(indent).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn run(command: Commands, config: &mut AppConfig, store: &mut dyn DocumentStore) -> Result<()> {
    match command {
        Commands::New { key, title } => {
            if store.load(&key).is_some() {
                return Err(DocumentError::AlreadyExists {
                    kind: EntityKind::Document,
                    id: key,
                });
            }
            let mut doc = Document::from_config(&config.data);
            doc.set_title(title.unwrap_or_else(|| DEFAULT_DOCUMENT_TITLE.to_string()));
            doc.ensure_layer();
            doc.save_to(store, &key);
            config.set_last_document(&key);
            info!("Created document {} ({})", key, doc.title());
        }
        Commands::Render { key } => {
            let doc = load(store, &key)?;
            println!("{}", render(&doc));
        }
        Commands::Write { key, x, y, text } => {
            let mut doc = load(store, &key)?;
            doc.ensure_layer();
            doc.set_to_region(x, y, &text.replace("\\n", "\n"), false)?;
            doc.save_to(store, &key);
            config.set_last_document(&key);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive for the duration of the program
    let _log_guard = logging::setup_logging();

    if let Err(e) = paths::ensure_directories() {
        warn!("Failed to create data directories: {}", e);
    }

    let loaded = config::load_config();
    if let Some(reason) = &loaded.reset_reason {
        warn!("Using default configuration. {}", reason);
    }
    let mut config = loaded.config;
    let mut store = FileStore::new(config.data.documents_dir());

    let result = run(cli.command, &mut config, &mut store);
    config.save_if_dirty();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
