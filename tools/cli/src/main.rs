//! tubeup CLI - Upload a video to YouTube from the command line.
//!
//! Authenticates with the cached token (refreshing or opening a browser as
//! needed) and performs a resumable upload.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use tubeup_api::{VideoService, YouTubeClient};
use tubeup_auth::Authenticator;
use tubeup_cli::{init_logging, parse_or_exit, AuthArgs};
use tubeup_common::PrivacyStatus;
use tubeup_upload::{UploadConfig, UploadRequest, Uploader, DEFAULT_CATEGORY_ID};

#[derive(Parser)]
#[command(name = "tubeup")]
#[command(about = "tubeup - Upload videos to YouTube")]
#[command(version)]
struct Cli {
    /// Video file to upload.
    file: PathBuf,

    /// Video title.
    #[arg(short, long)]
    title: String,

    /// Video description.
    #[arg(short, long, default_value = "")]
    description: String,

    /// Comma-separated keywords.
    #[arg(short, long, default_value = "")]
    keywords: String,

    /// Category id (22 = People & Blogs).
    #[arg(short, long, default_value = DEFAULT_CATEGORY_ID)]
    category: String,

    /// Privacy status.
    #[arg(short, long, value_enum, default_value_t = Privacy::Private)]
    privacy: Privacy,

    /// Declare the video as made for kids.
    #[arg(long)]
    made_for_kids: bool,

    #[command(flatten)]
    auth: AuthArgs,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Privacy {
    Private,
    Unlisted,
    Public,
}

impl From<Privacy> for PrivacyStatus {
    fn from(privacy: Privacy) -> Self {
        match privacy {
            Privacy::Private => PrivacyStatus::Private,
            Privacy::Unlisted => PrivacyStatus::Unlisted,
            Privacy::Public => PrivacyStatus::Public,
        }
    }
}

impl Cli {
    fn upload_request(&self) -> Result<UploadRequest> {
        let request = UploadRequest::new(&self.file, self.title.clone())?
            .with_description(self.description.clone())
            .with_keywords(&self.keywords)
            .with_category(self.category.clone())?
            .with_privacy(self.privacy.into())
            .with_made_for_kids(self.made_for_kids);
        Ok(request)
    }
}

/// Authenticate and upload, returning the video id and watch URL.
async fn run(
    cli: &Cli,
    authenticator: &Authenticator,
    service: Arc<dyn VideoService>,
) -> Result<(String, String)> {
    let request = cli.upload_request()?;
    if !request.file.is_file() {
        bail!("Video file not found: {}", request.file.display());
    }

    let credential = authenticator
        .get_valid_credential()
        .await
        .context("Authentication failed")?;

    let uploader = Uploader::new(service, UploadConfig::default());

    info!("Uploading: {}", request.title);
    let result = uploader
        .upload(&request, &credential)
        .await
        .context("Upload failed")?;

    match (result.success, result.video_id, result.url) {
        (true, Some(video_id), Some(url)) => Ok((video_id, url)),
        _ => bail!(
            "Upload failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = parse_or_exit();
    init_logging(cli.verbose)?;

    let config = cli.auth.config().context("Invalid configuration")?;
    let authenticator = Authenticator::new(config);
    let client = YouTubeClient::with_defaults().context("Failed to create YouTube client")?;

    let (video_id, url) = run(&cli, &authenticator, Arc::new(client)).await?;
    println!("Video uploaded successfully!");
    println!("  Video ID: {}", video_id);
    println!("  URL: {}", url);
    Ok(())
}
