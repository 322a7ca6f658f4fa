mod logging;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use api::{AppState, PrivateTicketCodec, TicketCodec};
use authz::{types::ImpersonationClaims, InMemoryDirectory, PermissionGate};
use clap::Parser;
use impersonation::ImpersonationConfig;

pub use logging::{init_logging, log_shutdown};

/// Impersonation server - start, stop and inspect user impersonation over HTTP
#[derive(Parser, Debug)]
#[command(name = "impersonation-server")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Port to listen on
    #[arg(long, env = "IMPERSONATION_PORT", default_value_t = 3040)]
    pub port: u16,

    /// JSON file with principals, claims and grants
    #[arg(long, env = "IMPERSONATION_DIRECTORY_FILE")]
    pub directory_file: Option<PathBuf>,

    /// Directory for daily log files
    #[arg(long, env = "IMPERSONATION_LOG_DIR", default_value = "./data/logs")]
    pub log_dir: PathBuf,

    /// Ticket encryption key, 128 hex characters
    #[arg(long, env = "IMPERSONATION_TICKET_KEY", hide_env_values = true)]
    pub ticket_key: Option<String>,

    /// Take identities from X-Remote-User/X-Remote-Auth-Type headers
    #[arg(long, env = "IMPERSONATION_TRUST_PROXY_HEADERS")]
    pub trust_proxy_headers: bool,
}

/// Load the principal directory and register the impersonation claims.
///
/// Without a file the directory is empty and every target is unknown.
pub fn load_directory(path: Option<&PathBuf>) -> Result<InMemoryDirectory> {
    let mut directory = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read directory file {:?}", path))?;
            let directory = InMemoryDirectory::from_json_str(&json)
                .with_context(|| format!("Failed to parse directory file {:?}", path))?;
            tracing::info!(
                "Loaded {} principals from {:?}",
                directory.principal_count(),
                path
            );
            directory
        }
        None => {
            tracing::warn!("No directory file configured; no principals are registered");
            InMemoryDirectory::new()
        }
    };

    directory.register_claims(ImpersonationClaims::all());
    Ok(directory)
}

/// The codec sealing ticket cookies.
pub fn ticket_codec(key: Option<&str>) -> Result<Arc<dyn TicketCodec>> {
    match key {
        Some(key) => Ok(Arc::new(
            PrivateTicketCodec::from_hex(key).context("Invalid IMPERSONATION_TICKET_KEY")?,
        )),
        None => {
            tracing::error!(
                "SECURITY WARNING: Using a randomly generated ticket key. Impersonation \
                 tickets will not survive a restart or work across instances. \
                 Set IMPERSONATION_TICKET_KEY (generate with: openssl rand -hex 64)."
            );
            Ok(Arc::new(PrivateTicketCodec::generate()))
        }
    }
}

/// Assemble the shared state for the API router.
pub fn build_state(args: &Args) -> Result<AppState> {
    let config = ImpersonationConfig::from_env();
    config.validate().context("Invalid impersonation configuration")?;
    tracing::info!(
        "Ticket timeout {} minutes, cookie '{}', accepted auth types {:?}",
        config.ticket_timeout.num_minutes(),
        config.cookie_name,
        config.accepted_auth_types
    );

    let directory = Arc::new(load_directory(args.directory_file.as_ref())?);
    let gate = PermissionGate::new(directory.clone(), directory);
    let codec = ticket_codec(args.ticket_key.as_deref())?;

    Ok(AppState::new(gate, config, codec).with_trusted_proxy(args.trust_proxy_headers))
}
