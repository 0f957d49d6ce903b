//! Shared pieces of the tubeup command line tools.

use clap::Args;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use tubeup_auth::{AuthConfig, CredentialStore};
use tubeup_common::Error;

/// Credential file locations; override `TUBEUP_*` variables when given.
#[derive(Debug, Clone, Default, Args)]
pub struct AuthArgs {
    /// OAuth2 client credentials file.
    #[arg(long, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Cached token file.
    #[arg(long, value_name = "PATH")]
    pub token: Option<PathBuf>,
}

impl AuthArgs {
    /// Environment configuration with these flags applied.
    pub fn config(&self) -> tubeup_common::Result<AuthConfig> {
        let mut config = AuthConfig::from_env()?;
        if let Some(path) = &self.credentials {
            config.credentials_path = path.clone();
        }
        if let Some(path) = &self.token {
            config.token_path = path.clone();
        }
        Ok(config)
    }
}

/// Install the global subscriber.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Parse arguments, exiting 0 for help/version and 1 for usage errors.
pub fn parse_or_exit<P: clap::Parser>() -> P {
    match P::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

/// Report whether the app credential file loads; prints one status line.
pub async fn check_credentials(store: &CredentialStore) -> bool {
    let path = store.credentials_path().display().to_string();
    match store.load_app_credential().await {
        Ok(app) => {
            println!("✅ {} found (client {})", path, app.client_id);
            true
        }
        Err(Error::MissingAppCredential(reason)) => {
            println!("❌ {}", reason);
            println!("Run the setup_youtube_auth tool first");
            false
        }
        Err(e) => {
            println!("❌ {} is unusable: {}", path, e);
            false
        }
    }
}
