//! tubeup-check - Verify the local setup before uploading.
//!
//! Exits 1 when the client credential file is missing or unusable.

use anyhow::{Context, Result};
use clap::Parser;

use tubeup_api::YouTubeClient;
use tubeup_auth::{AuthStatus, Authenticator};
use tubeup_cli::{check_credentials, init_logging, parse_or_exit, AuthArgs};

#[derive(Parser)]
#[command(name = "tubeup-check")]
#[command(about = "tubeup - Setup verification")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    auth: AuthArgs,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

async fn check_token(authenticator: &Authenticator) -> Result<()> {
    let client = YouTubeClient::with_defaults().context("Failed to create YouTube client")?;
    match authenticator.probe_authentication(&client).await {
        AuthStatus::Authenticated { channel: Some(channel) } => {
            println!("✅ Authenticated as {}", channel.snippet.title)
        }
        AuthStatus::Authenticated { channel: None } => {
            println!("✅ Authenticated, but no channel found")
        }
        AuthStatus::NotAuthenticated { reason } => {
            println!("⚠️  Not authenticated: {}", reason);
            println!("The first upload or authorize_youtube_access will open a browser");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = parse_or_exit();
    init_logging(cli.verbose)?;

    let authenticator = Authenticator::new(cli.auth.config().context("Invalid configuration")?);

    println!("tubeup - Setup Verification");
    println!("{}", "=".repeat(40));

    let credentials_ok = check_credentials(authenticator.store()).await;
    check_token(&authenticator).await?;

    println!("{}", "=".repeat(40));
    if credentials_ok {
        println!("✅ Setup complete! You can now upload videos");
        Ok(())
    } else {
        println!("❌ Please fix the issues above before proceeding");
        std::process::exit(1);
    }
}
