//! blobctl - store and fetch blobs on Walrus from the command line

mod config;

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walrus_storage_client::{
    compress_with, BlobClient, BlobContent, ImageFile, Payload, UploadRequest,
};

use crate::config::{compress_options, guess_content_type, Args, Command};

/// Exit code for `probe` when the store does not accept uploads
const EXIT_UNREACHABLE: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("blobctl={0},walrus_storage_client={0},info", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Local-only commands need no client
    match args.command {
        Command::Compress {
            ref input,
            ref output,
            max_width,
            quality,
        } => return compress(input, output, max_width, quality).await,
        Command::Url { ref id } => {
            let config = args.storage_config(read_config_file(&args).await?.as_deref())?;
            let client = BlobClient::new(config)?;
            println!("{}", client.blob_url(id));
            return Ok(());
        }
        _ => {}
    }

    let file_config = read_config_file(&args).await?;
    let config = args.storage_config(file_config.as_deref())?;
    debug!(
        publisher = %config.publisher_url,
        aggregator = %config.aggregator_url,
        epochs = config.default_epochs,
        "Storage configuration"
    );
    let client = BlobClient::new(config)?;

    match args.command {
        Command::Put {
            file,
            json,
            compress: compress_first,
            max_width,
            ..
        } => {
            let payload = match (file, json) {
                (_, Some(_)) if compress_first => anyhow::bail!("--compress needs a FILE"),
                (_, Some(text)) => {
                    let value: serde_json::Value =
                        serde_json::from_str(&text).context("--json is not valid JSON")?;
                    Payload::Json(value)
                }
                (Some(path), None) => {
                    let data = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let content_type = guess_content_type(&path);

                    if compress_first {
                        let image = ImageFile::new(file_name(&path), content_type, data);
                        compress_with(&image, &compress_options(max_width, None))?.into_payload()
                    } else {
                        Payload::binary(data, content_type)
                    }
                }
                (None, None) => anyhow::bail!("nothing to upload: pass a FILE or --json"),
            };

            let blob_id = client.upload(UploadRequest::new(payload)).await?;
            info!(blob_id = %blob_id, "Uploaded");
            println!("{}", blob_id);
        }

        Command::Get { id, output } => {
            let content = client.retrieve(&id).await?;
            match output {
                Some(path) => {
                    let data = content.into_bytes();
                    tokio::fs::write(&path, &data)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(bytes = data.len(), path = %path.display(), "Saved blob");
                }
                None => print_content(content)?,
            }
        }

        Command::Probe => {
            let status = client.probe().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            if !status.reachable {
                std::process::exit(EXIT_UNREACHABLE);
            }
        }

        Command::Compress { .. } | Command::Url { .. } => {}
    }

    Ok(())
}

async fn read_config_file(args: &Args) -> anyhow::Result<Option<String>> {
    match args.config {
        Some(ref path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

async fn compress(input: &Path, output: &Path, max_width: u32, quality: u8) -> anyhow::Result<()> {
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let image = ImageFile::new(file_name(input), guess_content_type(input), data);

    let compressed = compress_with(&image, &compress_options(max_width, Some(quality)))?;
    tokio::fs::write(output, &compressed.data)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{}x{} -> {}x{} ({} -> {} bytes)",
        compressed.original_width,
        compressed.original_height,
        compressed.width,
        compressed.height,
        image.data.len(),
        compressed.data.len()
    );
    Ok(())
}

fn print_content(content: BlobContent) -> anyhow::Result<()> {
    match content {
        BlobContent::Json { value, .. } => println!("{}", serde_json::to_string_pretty(&value)?),
        BlobContent::Bytes { content_type, data } => {
            match std::str::from_utf8(&data) {
                Ok(text) if is_text(content_type.as_deref()) => println!("{}", text),
                _ => println!(
                    "{} bytes ({}); use --output to save",
                    data.len(),
                    content_type.as_deref().unwrap_or("unknown type")
                ),
            }
        }
    }
    Ok(())
}

fn is_text(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|t| t.starts_with("text/"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
