use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use picker_kernel::config::PickerConfig;
use picker_kernel::gallery::{Gallery, GalleryEvent, ImageSource};
use picker_kernel::record::{ImageRecord, RecordFactory, RecordId};
use picker_kernel::store::{FileBackend, PersistenceStore};

mod encoder;
mod view;

use encoder::{acquire, JpegWriter};
use view::TerminalView;

/// Photo picker
#[derive(Parser, Debug)]
#[command(name = "picker")]
#[command(about = "Keep a durable, newest-first collection of photos", long_about = None)]
struct Cli {
    /// Path to config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the backing file (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored images, newest first
    List,

    /// Add an image file at the head of the collection
    Add {
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = Source::Library)]
        source: Source,
    },

    /// Replace the content of an existing image
    Replace { id: String, path: PathBuf },

    /// Remove an image
    Remove { id: String },

    /// Show the actions available for an image
    Actions { id: String },

    /// Write the stored bytes of an image to a file
    Export {
        id: String,

        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Source {
    Camera,
    Library,
}

impl From<Source> for ImageSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Camera => ImageSource::Camera,
            Source::Library => ImageSource::Library,
        }
    }
}

/// One line of `list` output
#[derive(Debug, Serialize)]
struct ListEntry {
    id: String,
    created_at: DateTime<Utc>,
    bytes: usize,
}

impl From<&ImageRecord> for ListEntry {
    fn from(record: &ImageRecord) -> Self {
        Self {
            id: record.id().to_string(),
            created_at: record.created_at(),
            bytes: record.payload().len(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let mut gallery = open_gallery(&config)?;

    match cli.command {
        Command::List => {
            let entries: Vec<ListEntry> = gallery.records().iter().map(ListEntry::from).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Command::Add { path, source } => {
            let acquired = acquire(&path, source.into())?;
            let id = gallery.add_image(&JpegWriter, &acquired)?;
            println!("{id}");
        }
        Command::Replace { id, path } => {
            let acquired = acquire(&path, ImageSource::Library)?;
            gallery.replace_image(&RecordId(id), &JpegWriter, &acquired)?;
        }
        Command::Remove { id } => {
            gallery.handle_event(GalleryEvent::DeleteRequested {
                record_id: RecordId(id),
            })?;
        }
        Command::Actions { id } => {
            gallery.handle_event(GalleryEvent::LongPressed {
                record_id: RecordId(id),
            })?;
        }
        Command::Export { id, out } => {
            let id = RecordId(id);
            let record = gallery
                .get(&id)
                .with_context(|| format!("record `{id}` not found"))?;
            fs::write(&out, record.payload())
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PickerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<PickerConfig>(&data)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => PickerConfig::default_config(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

fn open_gallery(config: &PickerConfig) -> Result<Gallery<FileBackend, TerminalView>> {
    let store = PersistenceStore::open(&config.data_dir, &config.filename)?;
    Ok(Gallery::open(
        store,
        TerminalView::default(),
        RecordFactory::system(),
        config.gallery_settings(),
    ))
}
