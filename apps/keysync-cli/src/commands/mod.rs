//! CLI subcommands.

pub mod pending;
pub mod send_codes;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use keysync_access::AccessClient;
use keysync_directory::{DirectoryClient, DirectorySource, DumpRecorder, ReplaySource};
use keysync_engine::{EngineError, HolderSelection, SyncService};

use crate::config::Settings;
use crate::error::CliResult;

/// Everything a command needs besides its own arguments.
pub struct AppContext {
    pub settings: Settings,
    /// Capture fetched directory payloads into this file.
    pub dump: Option<PathBuf>,
    /// Serve directory payloads from this file instead of the network.
    pub replay: Option<PathBuf>,
}

/// Wire up the directory source, the access client and the engine.
pub fn build_service(ctx: &AppContext) -> CliResult<SyncService> {
    let directory: Box<dyn DirectorySource> = match &ctx.replay {
        Some(path) => {
            tracing::info!(path = %path.display(), "replaying directory payloads from file");
            Box::new(ReplaySource::open(path).map_err(EngineError::from)?)
        }
        None => {
            let settings = &ctx.settings.directory;
            let mut client = DirectoryClient::new(
                settings.api_endpoint.clone(),
                settings.api_id.clone(),
                settings.api_key.clone(),
                Duration::from_secs(settings.timeout_secs),
            )
            .map_err(EngineError::from)?;
            if let Some(path) = &ctx.dump {
                client = client.with_dump(Arc::new(DumpRecorder::new(path)));
            }
            Box::new(client)
        }
    };

    let access = AccessClient::new(
        ctx.settings.access.api_endpoint.clone(),
        ctx.settings.access.api_key.clone(),
        Duration::from_secs(ctx.settings.access.timeout_secs),
    )
    .map_err(EngineError::from)?;

    Ok(SyncService::new(
        directory,
        Box::new(access),
        HolderSelection {
            aliases: ctx.settings.keyholders.aliases.clone(),
            roles: ctx.settings.keyholders.roles.clone(),
        },
    ))
}
