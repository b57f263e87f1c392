//! Command-line arguments for blobctl
//!
//! Every storage setting can come from a flag, the environment (or `.env`),
//! or a TOML file named by `WALRUS_CONFIG`. Flags and env override the file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use walrus_storage_client::{CompressOptions, StorageConfig};

/// Store and fetch blobs on Walrus
#[derive(Parser, Debug, Clone)]
#[command(name = "blobctl")]
#[command(about = "Store and fetch blobs on the Walrus publisher/aggregator")]
pub struct Args {
    /// Publisher base URL (uploads)
    #[arg(long, env = "WALRUS_PUBLISHER_URL", global = true)]
    pub publisher_url: Option<String>,

    /// Aggregator base URL (reads)
    #[arg(long, env = "WALRUS_AGGREGATOR_URL", global = true)]
    pub aggregator_url: Option<String>,

    /// TOML file with a full storage configuration
    #[arg(long, env = "WALRUS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upload a file or an inline JSON document and print its blob id
    Put {
        /// File to upload
        #[arg(conflicts_with = "json", required_unless_present = "json")]
        file: Option<PathBuf>,

        /// Inline JSON document to upload instead of a file
        #[arg(long)]
        json: Option<String>,

        /// Storage epochs
        #[arg(long, env = "WALRUS_EPOCHS")]
        epochs: Option<u32>,

        /// Compress the image to JPEG before upload
        #[arg(long, requires = "file", conflicts_with = "json")]
        compress: bool,

        /// Max width when compressing
        #[arg(long, default_value_t = walrus_storage_client::compress::DEFAULT_MAX_WIDTH)]
        max_width: u32,
    },

    /// Fetch a blob; JSON is pretty-printed
    Get {
        id: String,

        /// Write the blob here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Check that the blob store accepts uploads
    Probe,

    /// Compress an image locally
    Compress {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, default_value_t = walrus_storage_client::compress::DEFAULT_MAX_WIDTH)]
        max_width: u32,

        /// JPEG quality (1-100)
        #[arg(long, default_value_t = walrus_storage_client::compress::DEFAULT_QUALITY)]
        quality: u8,
    },

    /// Print the aggregator URL of a blob
    Url { id: String },
}

impl Args {
    /// Merge the optional TOML file with flag/env overrides.
    pub fn storage_config(&self, file_contents: Option<&str>) -> anyhow::Result<StorageConfig> {
        let mut config = match file_contents {
            Some(text) => StorageConfig::from_toml(text)?,
            None => StorageConfig::default(),
        };

        if let Some(ref url) = self.publisher_url {
            config.publisher_url = url.clone();
        }
        if let Some(ref url) = self.aggregator_url {
            config.aggregator_url = url.clone();
        }
        if let Command::Put { epochs: Some(epochs), .. } = self.command {
            config.default_epochs = epochs;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Compression settings for `compress` and `put --compress`.
pub fn compress_options(max_width: u32, quality: Option<u8>) -> CompressOptions {
    let options = CompressOptions::default().with_max_width(max_width);
    match quality {
        Some(q) => options.with_quality(q),
        None => options,
    }
}

/// Content type for a file, from its extension.
pub fn guess_content_type(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "txt" | "md" => "text/plain",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
