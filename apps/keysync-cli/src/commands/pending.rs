//! `keysync pending` - report outstanding registration codes.

use clap::Args;

use crate::commands::{build_service, AppContext};
use crate::error::CliResult;

#[derive(Debug, Args)]
pub struct PendingArgs {}

pub async fn execute(ctx: &AppContext, _args: PendingArgs) -> CliResult<()> {
    let service = build_service(ctx)?;
    let pending = service.list_pending_registration_codes().await?;

    for entry in &pending {
        println!(
            "{} {} (code valid until {})",
            entry.owner_display(),
            entry.phone_number.as_deref().unwrap_or("-"),
            entry.valid_until.format("%Y-%m-%d %H:%M UTC")
        );
    }
    println!("{} pending registration code(s)", pending.len());
    Ok(())
}
